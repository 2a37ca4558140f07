//! 4 bits per pixel tiles: each byte holds two horizontally adjacent pixels,
//! the left pixel in the low nibble. Rows are 4 bytes, top to bottom.

use super::{TileFormat, TileSamples};
use crate::palette::{Color, Palette};
use smallvec::SmallVec;

const ROW_BYTES: usize = 4;

pub(super) fn decode_tile(src: &[u8], tile: &mut TileSamples) {
    for (row, bytes) in tile.iter_mut().zip(src.chunks_exact(ROW_BYTES)) {
        for (pair, &byte) in row.chunks_exact_mut(2).zip(bytes) {
            pair[0] = byte & 0x0F;
            pair[1] = byte >> 4;
        }
    }
}

pub(super) fn encode_tile(tile: &TileSamples, dst: &mut [u8]) {
    for (row, bytes) in tile.iter().zip(dst.chunks_exact_mut(ROW_BYTES)) {
        for (pair, byte) in row.chunks_exact(2).zip(bytes.iter_mut()) {
            *byte = (pair[1] & 0x0F) << 4 | (pair[0] & 0x0F);
        }
    }
}

/// Colors keep the order they were found in; the palette is padded to 16 entries
pub(super) fn palette_for_colors(colors: &[Color]) -> (Palette, SmallVec<[u8; 16]>) {
    let palette = Palette::new(colors.iter().copied()).padded_to(TileFormat::Packed4bpp.max_colors());
    let indices = (0..colors.len() as u8).collect();

    (palette, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_pixel_is_low_nibble() {
        let mut src = [0u8; 32];
        src[0] = 0x21;
        src[31] = 0xF0;

        let mut tile = TileSamples::default();
        decode_tile(&src, &mut tile);
        assert_eq!(&tile[0][..2], &[1, 2]);
        assert_eq!(&tile[7][6..], &[0, 15]);

        let mut dst = [0u8; 32];
        encode_tile(&tile, &mut dst);
        assert_eq!(dst, src);
    }
}
