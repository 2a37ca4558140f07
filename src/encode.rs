use crate::{
    errors::LzError,
    format::{LzHeader, LzVariant},
};
use bitstream_io::{BigEndian, BitWrite, BitWriter};
use log::debug;
use std::{
    convert::TryFrom,
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
};

pub(crate) mod lzss;

pub use self::lzss::LzssSettings;
use self::lzss::{LzssPass, LzssToken};

type LogWtr<'a> = &'a mut dyn Write;

/// Number of tokens that share one control byte
const GROUP_SIZE: usize = 8;

/// The algorithm used to find matches when compressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LzssBackend {
    /// Check every position in the window
    Brute,
    /// Only check positions that share a three byte prefix. Faster, same output.
    HashChain,
}

/// Specify the compression settings, such as stream variant, logging, input, and output
///
/// To create a new `EncoderBuilder`, use [`for_reader()`], [`for_file()`], or [`for_bytes()`].
/// Then, change any of the encoding settings with `EncoderBuilder`'s helper methods.
/// Finally, compress the input data with [`encode_to_writer()`], [`encode_to_file()`], or [`encode_to_vec()`].
/// ```
/// # use romgfx::{EncoderBuilder, LzssBackend};
/// let input = b"ABBACABBCADFEGABA";
/// let compressed = EncoderBuilder::for_bytes(input)
///     .lz11()
///     .lzss_backend(LzssBackend::HashChain)
///     .with_logging(&mut ::std::io::stdout())
///     .encode_to_vec();
/// ```
///
/// The default settings are as follows:
/// * `0x10` streams
/// * No logging
/// * LZSS settings:
///   * 4096 byte window
///   * displacements of one allowed
///   * [`Brute`] match searching
///
/// [`for_reader()`]: EncoderBuilder::for_reader
/// [`for_file()`]: EncoderBuilder::for_file
/// [`for_bytes()`]: EncoderBuilder::for_bytes
/// [`encode_to_writer()`]: EncoderBuilder::encode_to_writer
/// [`encode_to_file()`]: EncoderBuilder::encode_to_file
/// [`encode_to_vec()`]: EncoderBuilder::encode_to_vec
/// [`Brute`]: LzssBackend::Brute
pub struct EncoderBuilder<'a, R> {
    rdr: R,
    variant: LzVariant,
    settings: LzssSettings,
    backend: LzssBackend,
    log: Option<LogWtr<'a>>,
}

impl<'a, R: Read> EncoderBuilder<'a, R> {
    /// Create a new `EncoderBuilder` for the data in `rdr`.
    #[inline]
    pub fn for_reader(rdr: R) -> Self {
        Self {
            rdr,
            variant: LzVariant::Lz10,
            settings: LzssSettings::default(),
            backend: LzssBackend::Brute,
            log: None,
        }
    }

    /// Set the layout of the compressed stream
    #[inline]
    pub fn variant(&mut self, variant: LzVariant) -> &mut Self {
        self.variant = variant;
        self
    }

    /// Convenience method to write `0x10` streams without importing [`LzVariant`].
    #[inline]
    pub fn lz10(&mut self) -> &mut Self {
        self.variant = LzVariant::Lz10;
        self
    }

    /// Convenience method to write `0x11` streams without importing [`LzVariant`].
    #[inline]
    pub fn lz11(&mut self) -> &mut Self {
        self.variant = LzVariant::Lz11;
        self
    }

    /// Set the settings used for the match search. See [`LzssSettings`] for more details.
    #[inline]
    pub fn with_lzss_settings(&mut self, settings: LzssSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    /// Set the algorithm used to search for matches
    #[inline]
    pub fn lzss_backend(&mut self, backend: LzssBackend) -> &mut Self {
        self.backend = backend;
        self
    }

    /// Write every emitted token to `log` while the input is being compressed.
    #[inline]
    pub fn with_logging<L: Write>(&mut self, log: &'a mut L) -> &mut Self {
        self.log = Some(log as &'a mut dyn Write);
        self
    }

    /// Start the compression and write the stream out to `wtr`
    #[inline]
    pub fn encode_to_writer<W: Write>(&mut self, wtr: W) -> Result<(), LzError> {
        do_encode(self, wtr)
    }

    /// Start the compression and write the stream out to the newly created
    /// `File` `f`
    #[inline]
    pub fn encode_to_file<P: AsRef<Path>>(&mut self, f: P) -> Result<(), LzError> {
        let mut wtr = BufWriter::new(File::create(f)?);
        self.encode_to_writer(&mut wtr)?;
        wtr.flush().map_err(Into::into)
    }

    /// Start the compression and return the stream in a `Vec<u8>`.
    #[inline]
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, LzError> {
        let mut csr = Cursor::new(Vec::new());
        self.encode_to_writer(&mut csr).map(|_| csr.into_inner())
    }
}

impl<'a> EncoderBuilder<'a, BufReader<File>> {
    /// Create a new `EncoderBuilder` for the file at `p`.
    #[inline]
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, LzError> {
        let rdr = BufReader::new(File::open(p)?);
        Ok(Self::for_reader(rdr))
    }
}

impl<'a> EncoderBuilder<'a, Cursor<&'a [u8]>> {
    /// Create a new `EncoderBuilder` for the data the `bytes` slice.
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        Self::for_reader(Cursor::new(bytes))
    }
}

/// Compress `bytes` into a `variant` stream with the default settings
///
/// This is a convenience function to compress a slice without having to
/// set up an [`EncoderBuilder`]. The output only depends on `bytes` and `variant`.
pub fn compress(bytes: &[u8], variant: LzVariant) -> Result<Vec<u8>, LzError> {
    EncoderBuilder::for_bytes(bytes).variant(variant).encode_to_vec()
}

fn do_encode<R: Read, W: Write>(
    opts: &mut EncoderBuilder<'_, R>,
    mut wtr: W,
) -> Result<(), LzError> {
    let EncoderBuilder {
        rdr,
        variant,
        settings,
        backend,
        ref mut log,
    } = opts;

    let mut input = Vec::new();
    rdr.read_to_end(&mut input)?;

    let pass = lzss::compress(&input, *variant, settings, *backend)?;
    debug!(
        "{}: {} bytes as {} tokens ({} matches)",
        variant,
        pass.decompressed_size,
        pass.tokens.len(),
        pass.matches()
    );

    if let Some(wtr) = log.as_mut() {
        write!(wtr, "{}", &pass)?;
    }

    write_stream(&mut wtr, *variant, &pass)
}

fn write_stream(wtr: &mut dyn Write, variant: LzVariant, pass: &LzssPass) -> Result<(), LzError> {
    let size = u32::try_from(pass.decompressed_size)
        .map_err(|_| LzError::TooLarge(pass.decompressed_size))?;

    let mut out = BitWriter::endian(wtr, BigEndian);
    let header = LzHeader { variant, size };
    header.write(&mut out)?;

    for group in pass.tokens.chunks(GROUP_SIZE) {
        out.write(8, control_byte(group))?;
        for token in group {
            write_token(&mut out, variant, token)?;
        }
    }

    out.byte_align()?;

    Ok(())
}

/// Flag each match in `group` with a set bit, first token in the most significant bit
fn control_byte(group: &[LzssToken]) -> u8 {
    group
        .iter()
        .enumerate()
        .filter(|(_, token)| token.is_match())
        .fold(0, |flags, (i, _)| flags | 0x80 >> i)
}

fn write_token<W: Write>(
    out: &mut BitWriter<W, BigEndian>,
    variant: LzVariant,
    token: &LzssToken,
) -> Result<(), LzError> {
    let (length, displacement) = match *token {
        LzssToken::Literal(byte) => return out.write(8, byte).map_err(Into::into),
        LzssToken::Match {
            length,
            displacement,
        } => (length, displacement),
    };

    match variant {
        LzVariant::Lz10 => out.write(4, (length - 3) as u8)?,
        LzVariant::Lz11 if length <= 0x10 => out.write(4, (length - 1) as u8)?,
        LzVariant::Lz11 if length <= 0x110 => {
            out.write(4, 0u8)?;
            out.write(8, (length - 0x11) as u8)?;
        }
        LzVariant::Lz11 => {
            out.write(4, 1u8)?;
            out.write(16, (length - 0x111) as u16)?;
        }
    }
    out.write(12, (displacement - 1) as u16)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_bytes(variant: LzVariant, length: usize, displacement: usize) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut wtr = BitWriter::endian(&mut out, BigEndian);
            let token = LzssToken::Match {
                length,
                displacement,
            };
            write_token(&mut wtr, variant, &token).unwrap();
        }
        out
    }

    #[test]
    fn lz10_match_tokens() {
        assert_eq!(token_bytes(LzVariant::Lz10, 3, 1), [0x00, 0x00]);
        assert_eq!(token_bytes(LzVariant::Lz10, 18, 4096), [0xFF, 0xFF]);
        assert_eq!(token_bytes(LzVariant::Lz10, 4, 0x123), [0x11, 0x22]);
    }

    #[test]
    fn lz11_length_tiers() {
        assert_eq!(token_bytes(LzVariant::Lz11, 3, 1), [0x20, 0x00]);
        assert_eq!(token_bytes(LzVariant::Lz11, 0x10, 2), [0xF0, 0x01]);
        assert_eq!(token_bytes(LzVariant::Lz11, 0x11, 2), [0x00, 0x00, 0x01]);
        assert_eq!(token_bytes(LzVariant::Lz11, 0x110, 0x1000), [0x0F, 0xFF, 0xFF]);
        assert_eq!(
            token_bytes(LzVariant::Lz11, 0x111, 1),
            [0x10, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            token_bytes(LzVariant::Lz11, 0x10110, 0x1000),
            [0x1F, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn control_byte_is_msb_first() {
        let group = [
            LzssToken::Literal(0),
            LzssToken::Match {
                length: 3,
                displacement: 1,
            },
            LzssToken::Literal(0),
        ];
        assert_eq!(control_byte(&group), 0b0100_0000);
    }
}
