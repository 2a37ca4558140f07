//! 2 bits per pixel tiles: each row is two bytes, the low bit plane followed
//! by the high bit plane. The leftmost pixel is the most significant bit.
//!
//! The two bit planes are also exposed as monochrome images through
//! [`TiledRaster::bit_plane`].

use super::{TileFormat, TileSamples, TiledRaster};
use crate::palette::{Color, Palette};
use image::{GrayImage, Luma};
use log::trace;
use smallvec::SmallVec;

const ROW_BYTES: usize = 2;
const SLOTS: usize = 4;
const WHITE_SLOT: usize = 0;
const BLACK_SLOT: usize = 3;

/// One of the two bits that make up a 2bpp pixel
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BitPlane {
    /// bit 0, stored in the first byte of each row
    Low = 0,
    /// bit 1, stored in the second byte of each row
    High = 1,
}

impl BitPlane {
    const fn mask(self) -> u8 {
        1 << self as u8
    }
}

pub(super) fn decode_tile(src: &[u8], tile: &mut TileSamples) {
    for (row, bytes) in tile.iter_mut().zip(src.chunks_exact(ROW_BYTES)) {
        let (low, high) = (bytes[0], bytes[1]);
        for (col, px) in row.iter_mut().enumerate() {
            let shift = 7 - col;
            *px = ((high >> shift) & 1) << 1 | ((low >> shift) & 1);
        }
    }
}

pub(super) fn encode_tile(tile: &TileSamples, dst: &mut [u8]) {
    for (row, bytes) in tile.iter().zip(dst.chunks_exact_mut(ROW_BYTES)) {
        let (mut low, mut high) = (0u8, 0u8);
        for (col, &px) in row.iter().enumerate() {
            let shift = 7 - col;
            low |= (px & 1) << shift;
            high |= ((px >> 1) & 1) << shift;
        }
        bytes[0] = low;
        bytes[1] = high;
    }
}

/// Place up to four colors into the conventional 2bpp order.
///
/// Pure white always lands in slot 0 and pure black in slot 3. The remaining
/// colors are sorted from light to dark and fill the free slots in order.
/// Slots left unused keep the shade of a plain gray ramp.
pub(super) fn palette_for_colors(colors: &[Color]) -> (Palette, SmallVec<[u8; 16]>) {
    let mut slots: [Option<usize>; SLOTS] = [None; SLOTS];
    slots[WHITE_SLOT] = colors.iter().position(|c| c.is_white());
    slots[BLACK_SLOT] = colors.iter().position(|c| c.is_black());

    let mut rest: SmallVec<[usize; SLOTS]> = (0..colors.len())
        .filter(|i| !slots.contains(&Some(*i)))
        .collect();
    rest.sort_by(|&a, &b| colors[a].cmp_brightness(&colors[b]));

    let mut rest = rest.into_iter();
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        *slot = rest.next();
    }

    let ramp = Palette::grayscale(SLOTS);
    let palette = slots
        .iter()
        .zip(ramp.colors())
        .map(|(slot, &shade)| slot.map_or(shade, |i| colors[i]))
        .collect();

    let mut indices: SmallVec<[u8; 16]> = SmallVec::from_elem(0, colors.len());
    for (slot, color) in slots.iter().enumerate() {
        if let Some(i) = *color {
            indices[i] = slot as u8;
        }
    }
    trace!("2bpp slots {:?} for colors {:?}", slots, colors);

    (palette, indices)
}

impl TiledRaster {
    /// A monochrome view of one bit plane of a 2bpp raster.
    ///
    /// Pixels with the plane's bit set are black (0) on a white (255) background.
    /// Both planes are computed together on first use and cached.
    /// Returns `None` for rasters of any other format.
    pub fn bit_plane(&self, plane: BitPlane) -> Option<&GrayImage> {
        if self.format != TileFormat::Planar2bpp {
            return None;
        }

        let planes = self
            .bit_planes
            .get_or_init(|| [render_plane(self, BitPlane::Low), render_plane(self, BitPlane::High)]);
        Some(&planes[plane as usize])
    }
}

fn render_plane(raster: &TiledRaster, plane: BitPlane) -> GrayImage {
    let mask = plane.mask();
    GrayImage::from_fn(raster.width() as u32, raster.height() as u32, |x, y| {
        if raster.pixel(x as usize, y as usize) & mask != 0 {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_low_then_high_plane() {
        let mut src = [0u8; 16];
        // row 0: pixel 0 = 1, pixel 1 = 2, pixel 7 = 3
        src[0] = 0b1000_0001;
        src[1] = 0b0100_0001;

        let mut tile = TileSamples::default();
        decode_tile(&src, &mut tile);
        assert_eq!(tile[0], [1, 2, 0, 0, 0, 0, 0, 3]);
        assert_eq!(tile[1], [0; 8]);

        let mut dst = [0xAAu8; 16];
        encode_tile(&tile, &mut dst);
        assert_eq!(dst, src);
    }

    #[test]
    fn white_and_black_are_pinned() {
        let gray = Color::from_rgb(0x80, 0x80, 0x80);
        let red = Color::from_rgb(0xC0, 0x00, 0x00);
        let colors = [Color::BLACK, gray, Color::WHITE, red];

        let (palette, indices) = palette_for_colors(&colors);
        assert_eq!(palette.colors(), &[Color::WHITE, red, gray, Color::BLACK]);
        assert_eq!(&indices[..], &[3, 2, 0, 1]);
    }

    #[test]
    fn missing_white_leaves_sorted_colors_first() {
        let light = Color::from_rgb(0xE0, 0xE0, 0xE0);
        let colors = [Color::BLACK, light];

        let (palette, indices) = palette_for_colors(&colors);
        assert_eq!(palette.get(0), Some(light));
        assert_eq!(palette.get(3), Some(Color::BLACK));
        assert_eq!(&indices[..], &[3, 0]);
    }
}
