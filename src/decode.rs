use crate::errors::LzError;
use crate::format::{LzHeader, LzVariant};
use bitstream_io::{BigEndian, BitRead, BitReader};
use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Write},
    path::Path,
};

type LogWtr<'a> = &'a mut dyn Write;

/// Specify the decoding settings, such as logging, input, and output.
///
/// To create a new `Decoder`, use [`for_reader()`], [`for_bytes()`], or
/// [`for_file()`]. Then, change any of the decoder settings.
/// Finally, decode the input data with [`decode()`].
/// ```
/// # use romgfx::{EncoderBuilder, Decoder};
/// let original = b"ABBACABBACD";
/// let compressed = EncoderBuilder::for_bytes(original)
///     .encode_to_vec()
///     .unwrap();
/// let decompressed = Decoder::for_bytes(&compressed)
///     .decode()
///     .unwrap();
/// assert_eq!(&original[..], decompressed);
/// ```
/// You can use a `Decoder` to get the [`LzHeader`] with [`header()`]:
/// ```
/// # use romgfx::{EncoderBuilder, Decoder};
/// # let original = b"ABBACABBACD";
/// # let compressed = EncoderBuilder::for_bytes(original).encode_to_vec().unwrap();
/// let mut decoder = Decoder::for_bytes(&compressed);
/// let size = decoder.header().unwrap().size as usize;
/// assert_eq!(size, original.len());
/// ```
/// Only `0x10` streams can be decoded. Reading the header works for both variants.
///
/// [`for_reader()`]: Decoder::for_reader
/// [`for_bytes()`]: Decoder::for_bytes
/// [`for_file()`]: Decoder::for_file
/// [`decode()`]: Decoder::decode
/// [`header()`]: Decoder::header
pub struct Decoder<'a, R: Read> {
    src: BitReader<R, BigEndian>,
    log: Option<LogWtr<'a>>,
    header: Option<LzHeader>,
}

impl<'a, R: Read> Decoder<'a, R> {
    /// Create a new `Decoder` for the stream in `rdr`.
    #[inline]
    pub fn for_reader(rdr: R) -> Self {
        Self {
            src: BitReader::endian(rdr, BigEndian),
            log: None,
            header: None,
        }
    }

    /// Write every decoded token to `wtr` while the stream is being decoded.
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    /// Read the stream's [`LzHeader`], or return the one already read.
    #[inline]
    pub fn header(&mut self) -> Result<LzHeader, LzError> {
        match self.header {
            Some(hdr) => Ok(hdr),
            None => {
                let hdr = LzHeader::from_bitreader(&mut self.src)?;
                self.header = Some(hdr);
                Ok(hdr)
            }
        }
    }

    /// Decode the `0x10` stream into a `Vec<u8>`.
    #[inline]
    pub fn decode(&mut self) -> Result<Vec<u8>, LzError> {
        do_decode(self)
    }
}

impl<'a> Decoder<'a, Cursor<&'a [u8]>> {
    /// Create a new `Decoder` for the stream in the `bytes` slice.
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        let rdr = Cursor::new(bytes);
        Self::for_reader(rdr)
    }
}

impl<'a> Decoder<'a, BufReader<File>> {
    /// Create a new `Decoder` for the stream in the file at `p`.
    #[inline]
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, LzError> {
        File::open(p)
            .map(BufReader::new)
            .map(Self::for_reader)
            .map_err(Into::into)
    }
}

/// Decompress a `0x10` stream into a `Vec<u8>`
///
/// This is a convenience function to decode a `Read`er without
/// having to import and set up a [`Decoder`]
pub fn decode<R: Read>(rdr: R) -> Result<Vec<u8>, LzError> {
    Decoder::for_reader(rdr).decode()
}

/// Extract the [`LzHeader`] from a stream of either variant
///
/// This is a convenience function to read the header without having
/// to set up a [`Decoder`]
pub fn lz_info<R: Read>(rdr: R) -> Result<LzHeader, LzError> {
    Decoder::for_reader(rdr).header()
}

fn do_decode<R: Read>(opt: &mut Decoder<R>) -> Result<Vec<u8>, LzError> {
    let header = opt.header()?;
    if header.variant != LzVariant::Lz10 {
        return Err(LzError::UnsupportedVariant(header.variant));
    }
    let Decoder { src, log, .. } = opt;

    if let Some(wtr) = log.as_mut() {
        writeln!(wtr, "# Header\n{:?}", &header)?;
    }

    let output_size = header.size as usize;
    let mut output: Vec<u8> = Vec::with_capacity(output_size);

    while output.len() < output_size {
        let flags: u8 = src.read(8)?;

        for slot in 0..8 {
            if output.len() >= output_size {
                break;
            }

            if flags & (0x80 >> slot) != 0 {
                let length = src.read::<u8>(4)? as usize + LzVariant::MIN_MATCH;
                let displacement = src.read::<u16>(12)? as usize + 1;

                if displacement > output.len() {
                    return Err(LzError::BadLookBack {
                        displacement,
                        available: output.len(),
                    });
                }

                let start = output.len() - displacement;
                if let Some(wtr) = log.as_mut() {
                    writeln!(
                        wtr,
                        "{:04x} - Match: length {} disp {} | start: {:04x}",
                        output.len(),
                        length,
                        displacement,
                        start
                    )?;
                }

                // the copy may run into the bytes it produces
                for i in start..start + length {
                    if output.len() >= output_size {
                        break;
                    }
                    let byte = output[i];
                    output.push(byte);
                }
            } else {
                let byte: u8 = src.read(8)?;
                output.push(byte);

                if let Some(wtr) = log.as_mut() {
                    writeln!(wtr, "{:04x} - Literal: {:02x}", output.len() - 1, byte)?;
                }
            }
        }
    }

    Ok(output)
}
