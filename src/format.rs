//! Information and structures for LZSS compressed streams.
//!
//! Both stream variants share the same layout:
//! 1. Header
//! 2. Token groups
//!
//! ## Header
//! The header is four bytes, or eight bytes when the decompressed data is
//! larger than what fits in 24 bits. It can be extracted into an [`LzHeader`]
//! by using [`lz_info()`].
//!
//! | Byte Num | Description |
//! | :------: | ----------- |
//! | 0        | variant tag (`0x10` or `0x11`) |
//! | 1..4     | size in little endian bytes of decompressed data |
//! | 4..8     | only present when bytes 1..4 are zero: 32-bit little endian size |
//!
//! ## Token Groups
//! After the header, tokens are stored in groups of up to eight. Each group
//! starts with a control byte. The bits of the control byte are read from
//! most to least significant, and a `0` marks a literal byte while a `1`
//! marks a back-reference ("match") to already decoded data. The final group
//! may be short; only the bits for the tokens that are present are meaningful.
//!
//! Every match stores the displacement minus one in the low 12 bits of its
//! last two bytes, so a match can reach at most 4096 bytes back.
//!
//! ### Variant `0x10`
//! Matches are always two bytes:
//! ```text
//! LLLL DDDD  DDDD DDDD
//! └ length - 3 (3..=18)
//! ```
//!
//! ### Variant `0x11`
//! The top nibble of the first match byte selects the size of the token:
//!
//! | Nibble | Token Bytes | Length Range | Stored Length |
//! | :----: | :---------: | ------------ | ------------- |
//! | `2..=F`| 2           | 3..=0x10     | `length - 1` in the top nibble |
//! | `0`    | 3           | 0x11..=0x110 | 8 bits of `length - 0x11` after the marker |
//! | `1`    | 4           | 0x111..=0x10110 | 16 bits of `length - 0x111` after the marker |
//!
//! ## An Example
//! Let's compress `AA BB AA BB AA BB` with variant `0x10`.
//! The token stream is two literals followed by a match of length 4 that reaches back 2 bytes.
//! ```text
//! Header
//! 10       <- variant 0x10
//! 060000   <- original size of 6 bytes
//!
//! Token Group
//! 20       <- control: 0 0 1 (literal, literal, match)
//! AA       <- literal
//! BB       <- literal
//! 10 01    <- match: length (1 + 3), displacement (1 + 1)
//! ```
//! [`lz_info()`]: crate::lz_info

use crate::errors::LzError;
use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, BE};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::io::{self, Read, Write};

/// The two LZSS stream layouts, named after their tag byte.
///
/// `Lz10` stores every match in two bytes, and so can only copy up to 18 bytes at once.
/// `Lz11` adds two longer match encodings for long runs of repeated data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LzVariant {
    Lz10 = 0x10,
    Lz11 = 0x11,
}

impl LzVariant {
    /// shortest match that is ever encoded as a back-reference
    pub const MIN_MATCH: usize = 3;
    /// farthest a match can reach back into the decoded data
    pub const MAX_DISPLACEMENT: usize = 0x1000;

    /// The tag byte written at the start of a stream of this variant
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, LzError> {
        match tag {
            0x10 => Ok(Self::Lz10),
            0x11 => Ok(Self::Lz11),
            unk => Err(LzError::InvalidTag(unk)),
        }
    }

    /// longest match that can be stored in a single token
    pub const fn max_match(self) -> usize {
        match self {
            Self::Lz10 => 0x12,
            Self::Lz11 => 0x10110,
        }
    }
}

impl fmt::Display for LzVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Lz10 => write!(f, "LZ10 (tag 0x10)"),
            Self::Lz11 => write!(f, "LZ11 (tag 0x11)"),
        }
    }
}

/// The information stored at the start of an LZSS stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzHeader {
    pub variant: LzVariant,
    /// size of decompressed data
    pub size: u32,
}

impl LzHeader {
    /// largest size that fits in the short, three byte size field
    pub const MAX_SHORT_SIZE: u32 = 0xFF_FFFF;

    /// Read the header from the start of a bitstream.
    ///
    /// A zero short size means a 32-bit size follows. A stream that ends right
    /// after a zero short size is the header of empty data.
    pub(crate) fn from_bitreader<R: Read>(reader: &mut BitReader<R, BE>) -> Result<Self, LzError> {
        let mut header = [0u8; 4];
        reader.read_bytes(&mut header)?;

        let variant = LzVariant::from_tag(header[0])?;
        let size = match LittleEndian::read_u24(&header[1..4]) {
            0 => {
                let mut extended = [0u8; 4];
                match reader.read_bytes(&mut extended) {
                    Ok(()) => LittleEndian::read_u32(&extended),
                    Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
                    Err(e) => return Err(e.into()),
                }
            }
            short => short,
        };

        Ok(Self { variant, size })
    }

    /// Write out `self` to the `BitWriter`, switching to the extended size field when needed
    pub(crate) fn write<W: Write>(&self, wtr: &mut BitWriter<W, BE>) -> Result<(), LzError> {
        let mut size = [0u8; 4];
        wtr.write(8, self.variant.tag())?; // 0

        if self.size > Self::MAX_SHORT_SIZE {
            wtr.write_bytes(&[0; 3])?; // 1..4
            LittleEndian::write_u32(&mut size, self.size);
            wtr.write_bytes(&size)?; // 4..8
        } else {
            LittleEndian::write_u24(&mut size, self.size);
            wtr.write_bytes(&size[..3])?; // 1..4
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream_io::BigEndian;
    use std::io::Cursor;

    fn header_bytes(header: LzHeader) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut wtr = BitWriter::endian(&mut out, BigEndian);
            header.write(&mut wtr).unwrap();
        }
        out
    }

    #[test]
    fn short_size_is_three_bytes() {
        let bytes = header_bytes(LzHeader {
            variant: LzVariant::Lz11,
            size: 0x0001_0203,
        });
        assert_eq!(bytes, [0x11, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn large_size_uses_extended_field() {
        let hdr = LzHeader {
            variant: LzVariant::Lz10,
            size: 0x0100_0000,
        };
        let bytes = header_bytes(hdr);
        assert_eq!(bytes, [0x10, 0, 0, 0, 0x00, 0x00, 0x00, 0x01]);

        let mut rdr = BitReader::endian(Cursor::new(&bytes[..]), BigEndian);
        assert_eq!(LzHeader::from_bitreader(&mut rdr).unwrap(), hdr);
    }

    #[test]
    fn zero_size_header_without_extension_reads_as_empty() {
        let bytes = [0x10u8, 0, 0, 0];
        let mut rdr = BitReader::endian(Cursor::new(&bytes[..]), BigEndian);
        let hdr = LzHeader::from_bitreader(&mut rdr).unwrap();
        assert_eq!(hdr.size, 0);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let bytes = [0x40u8, 1, 0, 0];
        let mut rdr = BitReader::endian(Cursor::new(&bytes[..]), BigEndian);
        match LzHeader::from_bitreader(&mut rdr) {
            Err(LzError::InvalidTag(0x40)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }
}
