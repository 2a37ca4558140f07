use std::fmt;

use crate::{errors::LzError, format::LzVariant};

use super::LzssBackend;

/// Configure the LZSS match search
///
/// Both stream variants address at most 4096 bytes back, so that is the
/// largest (and [`default`](LzssSettings::default)) window. A smaller window
/// only trades compression for speed.
///
/// `vram_safe` forbids matches with a displacement of one. The GBA BIOS
/// decompresses into VRAM two bytes at a time, so a match that copies the byte
/// it just wrote reads stale data there.
///
/// | Parameter   | Field         | Default |
/// | ----------- | ------------- | :-----: |
/// | Window      | `window_size` | 4096    |
/// | VRAM Safe   | `vram_safe`   | `false` |
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LzssSettings {
    /// how many already processed bytes can be searched for a match
    pub window_size: usize,
    /// never emit a match with a displacement of one
    pub vram_safe: bool,
}

impl LzssSettings {
    pub const fn new(window_size: usize, vram_safe: bool) -> Self {
        Self {
            window_size,
            vram_safe,
        }
    }

    const fn min_displacement(&self) -> usize {
        if self.vram_safe {
            2
        } else {
            1
        }
    }

    fn validate(&self) -> Result<(), LzError> {
        let max = LzVariant::MAX_DISPLACEMENT;
        if self.window_size < self.min_displacement() || self.window_size > max {
            return Err(LzError::InvalidSettings(format!(
                "window size {} must be between {} and {}",
                self.window_size,
                self.min_displacement(),
                max
            )));
        }

        Ok(())
    }
}

impl Default for LzssSettings {
    fn default() -> Self {
        Self {
            window_size: LzVariant::MAX_DISPLACEMENT,
            vram_safe: false,
        }
    }
}

/// A single token of the compressed stream
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum LzssToken {
    Literal(u8),
    Match { length: usize, displacement: usize },
}

impl LzssToken {
    /// total number of input bytes this token stands for
    pub(crate) fn size(&self) -> usize {
        match self {
            Self::Literal(..) => 1,
            Self::Match { length, .. } => *length,
        }
    }

    #[inline]
    pub(crate) fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

#[derive(Debug)]
pub(crate) struct LzssPass {
    pub tokens: Vec<LzssToken>,
    pub decompressed_size: usize,
}

impl LzssPass {
    pub(crate) fn matches(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_match()).count()
    }
}

impl fmt::Display for LzssPass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "# LZSS Tokens")?;
        let mut position = 0;
        for token in &self.tokens {
            write!(f, "{:04x} - ", position)?;
            match token {
                LzssToken::Literal(b) => writeln!(f, "Literal: {:02x}", b),
                LzssToken::Match {
                    length,
                    displacement,
                } => writeln!(f, "Match: length {} disp {}", length, displacement),
            }?;
            position += token.size();
        }

        Ok(())
    }
}

/// Compress all of `input` into a list of tokens for `variant`.
pub(super) fn compress(
    input: &[u8],
    variant: LzVariant,
    settings: &LzssSettings,
    backend: LzssBackend,
) -> Result<LzssPass, LzError> {
    settings.validate()?;

    let limits = Limits {
        window: settings.window_size,
        min_displacement: settings.min_displacement(),
        max_match: variant.max_match(),
    };
    let mut finder: Box<dyn MatchFinder> = match backend {
        LzssBackend::Brute => Box::new(NaiveBrute),
        LzssBackend::HashChain => Box::new(HashChain::new()),
    };

    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < input.len() {
        let token = match finder.find(input, pos, &limits) {
            Some(Candidate {
                length,
                displacement,
            }) => LzssToken::Match {
                length,
                displacement,
            },
            None => LzssToken::Literal(input[pos]),
        };

        pos += token.size();
        tokens.push(token);
    }

    Ok(LzssPass {
        tokens,
        decompressed_size: input.len(),
    })
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    window: usize,
    min_displacement: usize,
    max_match: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Candidate {
    length: usize,
    displacement: usize,
}

/// Find the longest match for the data at `pos`.
///
/// Of equally long matches, the one with the smallest displacement wins.
/// Matches shorter than [`LzVariant::MIN_MATCH`] are never returned.
trait MatchFinder {
    fn find(&mut self, input: &[u8], pos: usize, limits: &Limits) -> Option<Candidate>;
}

/// Longest match length allowed at `pos`, or `None` if too little input remains
fn max_length_at(input: &[u8], pos: usize, limits: &Limits) -> Option<usize> {
    let max = limits.max_match.min(input.len() - pos);
    if max >= LzVariant::MIN_MATCH {
        Some(max)
    } else {
        None
    }
}

/// Number of bytes at `pos` that match the data `displacement` bytes back.
/// The source may run into the bytes being matched.
fn match_length(input: &[u8], pos: usize, displacement: usize, max: usize) -> usize {
    input[pos - displacement..]
        .iter()
        .zip(&input[pos..pos + max])
        .take_while(|(s, d)| s == d)
        .count()
}

/// Keep `best` unless `length` is strictly longer.
/// Returns true once nothing longer can be found.
fn consider(best: &mut Option<Candidate>, length: usize, displacement: usize, max: usize) -> bool {
    let longer = best.map_or(true, |b| length > b.length);
    if length >= LzVariant::MIN_MATCH && longer {
        *best = Some(Candidate {
            length,
            displacement,
        });
    }

    length == max
}

/// Check every displacement in the window, nearest first
#[derive(Debug, Clone, Copy)]
struct NaiveBrute;

impl MatchFinder for NaiveBrute {
    fn find(&mut self, input: &[u8], pos: usize, limits: &Limits) -> Option<Candidate> {
        let max = max_length_at(input, pos, limits)?;
        let farthest = limits.window.min(pos);

        let mut best = None;
        for displacement in limits.min_displacement..=farthest {
            let length = match_length(input, pos, displacement, max);
            if consider(&mut best, length, displacement, max) {
                break;
            }
        }

        best
    }
}

/// Only check earlier positions that start with the same three bytes.
///
/// Chains are walked from the most recent position backwards, which is the
/// same nearest-first order [`NaiveBrute`] uses, so both find the same matches.
#[derive(Debug, Clone)]
struct HashChain {
    /// most recent position for each hash
    head: Vec<Option<usize>>,
    /// previous position with the same hash, indexed by position modulo the window.
    /// A slot is only overwritten once its position is out of reach.
    prev: Vec<Option<usize>>,
    /// positions below this have been inserted
    inserted: usize,
}

impl HashChain {
    const HASH_BITS: u32 = 12;

    const RING: usize = LzVariant::MAX_DISPLACEMENT;

    fn new() -> Self {
        Self {
            head: vec![None; 1 << Self::HASH_BITS],
            prev: vec![None; Self::RING],
            inserted: 0,
        }
    }

    fn hash(bytes: &[u8]) -> usize {
        let key = u32::from(bytes[0]) << 16 | u32::from(bytes[1]) << 8 | u32::from(bytes[2]);
        (key.wrapping_mul(0x9E37_79B1) >> (32 - Self::HASH_BITS)) as usize
    }

    fn insert_until(&mut self, input: &[u8], pos: usize) {
        while self.inserted < pos {
            let p = self.inserted;
            if p + LzVariant::MIN_MATCH <= input.len() {
                let h = Self::hash(&input[p..]);
                self.prev[p % Self::RING] = self.head[h];
                self.head[h] = Some(p);
            }
            self.inserted += 1;
        }
    }
}

impl MatchFinder for HashChain {
    fn find(&mut self, input: &[u8], pos: usize, limits: &Limits) -> Option<Candidate> {
        self.insert_until(input, pos);
        let max = max_length_at(input, pos, limits)?;

        let mut best = None;
        let mut next = self.head[Self::hash(&input[pos..])];
        while let Some(p) = next {
            let displacement = pos - p;
            if displacement > limits.window {
                break;
            }
            if displacement >= limits.min_displacement {
                let length = match_length(input, pos, displacement, max);
                if consider(&mut best, length, displacement, max) {
                    break;
                }
            }
            next = self.prev[p % Self::RING];
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8], variant: LzVariant, settings: LzssSettings, backend: LzssBackend) -> Vec<LzssToken> {
        compress(input, variant, &settings, backend).unwrap().tokens
    }

    fn sample_input() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..3000u32 {
            data.push((i * 7 % 13) as u8);
            if i % 5 == 0 {
                data.extend_from_slice(b"tile");
            }
            if i % 97 == 0 {
                data.extend(std::iter::repeat(0).take(40));
            }
        }
        data
    }

    #[test]
    fn backends_agree() {
        let input = sample_input();
        for &variant in &[LzVariant::Lz10, LzVariant::Lz11] {
            for &vram_safe in &[false, true] {
                let settings = LzssSettings::new(4096, vram_safe);
                assert_eq!(
                    tokens(&input, variant, settings, LzssBackend::Brute),
                    tokens(&input, variant, settings, LzssBackend::HashChain),
                    "{} vram_safe={}",
                    variant,
                    vram_safe
                );
            }
        }
    }

    #[test]
    fn nearest_of_equal_matches_wins() {
        // "abc" appears 8 and 4 bytes before the final copy
        let input = b"abcXabcYabc";
        let toks = tokens(input, LzVariant::Lz10, LzssSettings::default(), LzssBackend::Brute);
        assert_eq!(
            toks.last(),
            Some(&LzssToken::Match {
                length: 3,
                displacement: 4
            })
        );
    }

    #[test]
    fn vram_safe_skips_displacement_one() {
        let input = [7u8; 10];
        let plain = tokens(&input, LzVariant::Lz10, LzssSettings::default(), LzssBackend::Brute);
        assert_eq!(
            plain[1],
            LzssToken::Match {
                length: 9,
                displacement: 1
            }
        );

        let safe = tokens(&input, LzVariant::Lz10, LzssSettings::new(4096, true), LzssBackend::Brute);
        assert_eq!(&safe[..2], &[LzssToken::Literal(7), LzssToken::Literal(7)]);
        assert_eq!(
            safe[2],
            LzssToken::Match {
                length: 8,
                displacement: 2
            }
        );
    }

    #[test]
    fn oversized_window_is_rejected() {
        let err = compress(b"abc", LzVariant::Lz10, &LzssSettings::new(4097, false), LzssBackend::Brute);
        assert!(matches!(err, Err(LzError::InvalidSettings(_))));
    }
}
