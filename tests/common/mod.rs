#![allow(dead_code)]

use nanorand::{Rng, WyRand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(u8),
    Match { length: usize, displacement: usize },
}

/// Parsed form of a compressed stream
#[derive(Debug)]
pub struct Stream {
    pub tag: u8,
    pub size: usize,
    pub control_bytes: Vec<u8>,
    pub tokens: Vec<Token>,
}

/// Walk a `0x10` or `0x11` stream byte by byte, independent of the crate's own decoder
pub fn parse(stream: &[u8]) -> Stream {
    let tag = stream[0];
    let mut size = usize::from(stream[1]) | usize::from(stream[2]) << 8 | usize::from(stream[3]) << 16;
    let mut pos = 4;
    if size == 0 && stream.len() >= 8 {
        size = u32::from_le_bytes([stream[4], stream[5], stream[6], stream[7]]) as usize;
        pos = 8;
    }

    let mut control_bytes = Vec::new();
    let mut tokens = Vec::new();
    let mut produced = 0;
    while produced < size {
        let flags = stream[pos];
        pos += 1;
        control_bytes.push(flags);

        for slot in 0..8 {
            if produced >= size {
                break;
            }
            if flags & (0x80 >> slot) == 0 {
                tokens.push(Token::Literal(stream[pos]));
                pos += 1;
                produced += 1;
                continue;
            }

            let b = |i: usize| usize::from(stream[pos + i]);
            let (length, displacement, used) = match (tag, stream[pos] >> 4) {
                (0x10, n) => (usize::from(n) + 3, ((b(0) & 0xF) << 8 | b(1)) + 1, 2),
                (0x11, 0) => (
                    ((b(0) & 0xF) << 4 | b(1) >> 4) + 0x11,
                    ((b(1) & 0xF) << 8 | b(2)) + 1,
                    3,
                ),
                (0x11, 1) => (
                    ((b(0) & 0xF) << 12 | b(1) << 4 | b(2) >> 4) + 0x111,
                    ((b(2) & 0xF) << 8 | b(3)) + 1,
                    4,
                ),
                (0x11, n) => (usize::from(n) + 1, ((b(0) & 0xF) << 8 | b(1)) + 1, 2),
                (unk, _) => panic!("unknown tag {:#x}", unk),
            };
            pos += used;
            produced += length;
            tokens.push(Token::Match {
                length,
                displacement,
            });
        }
    }
    assert_eq!(pos, stream.len(), "trailing bytes after the last token");

    Stream {
        tag,
        size,
        control_bytes,
        tokens,
    }
}

/// Reference decompressor for both stream variants
pub fn decompress(stream: &[u8]) -> Vec<u8> {
    let parsed = parse(stream);
    let mut out = Vec::with_capacity(parsed.size);

    for token in parsed.tokens {
        match token {
            Token::Literal(b) => out.push(b),
            Token::Match {
                length,
                displacement,
            } => {
                assert!(displacement <= out.len(), "match reaches before the start");
                let start = out.len() - displacement;
                for i in start..start + length {
                    let b = out[i];
                    out.push(b);
                }
            }
        }
    }
    out.truncate(parsed.size);

    out
}

/// Bytes drawn from a small alphabet, with some copied runs mixed in
pub fn repetitive_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = WyRand::new_seed(seed);
    let mut data: Vec<u8> = Vec::with_capacity(len);

    while data.len() < len {
        let copy = rng.generate_range(0_u8..4) == 0 && data.len() > 8;
        if copy {
            let back = rng.generate_range(1..=data.len().min(5000));
            let run = rng.generate_range(3_usize..300);
            let start = data.len() - back;
            for i in start..start + run {
                let b = data[i];
                data.push(b);
            }
        } else {
            data.push(rng.generate_range(0_u8..6));
        }
    }
    data.truncate(len);

    data
}

pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = WyRand::new_seed(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data);
    data
}
