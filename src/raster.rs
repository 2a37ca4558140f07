//! Tiled, indexed-color rasters and the packed tile formats they are stored in.
//!
//! A [`TiledRaster`] is a grid of 8x8 pixel tiles. Every pixel holds an index
//! into the raster's [`Palette`]. The raster knows how to read itself from,
//! and write itself back to, the per-tile byte layout of its [`TileFormat`]:
//!
//! | Format | Bytes per Tile | Colors | Layout |
//! | ------ | :------------: | :----: | ------ |
//! | [`Packed4bpp`] | 32 | 16 | two pixels per byte, left pixel in the low nibble |
//! | [`Planar2bpp`] | 16 | 4  | two bytes per row, low bit plane then high bit plane |
//!
//! Tiles are numbered either row-major (left to right, then top to bottom) or
//! column-major (top to bottom, then left to right). The same numbering is used
//! when decoding, encoding, and extracting tile ranges, so a raster always
//! round-trips through its own byte layout.
//!
//! [`Packed4bpp`]: TileFormat::Packed4bpp
//! [`Planar2bpp`]: TileFormat::Planar2bpp

use crate::errors::GfxError;
use crate::palette::{Color, Palette};
use image::{GrayImage, RgbaImage};
use log::{debug, trace};
use once_cell::sync::OnceCell;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;

mod packed;
mod planar;

pub use self::planar::BitPlane;

/// Width and height of a tile, in pixels
pub const TILE_SIZE: usize = 8;

/// Color indices of a single tile, indexed `[row][column]`
pub(crate) type TileSamples = [[u8; TILE_SIZE]; TILE_SIZE];

/// Largest tile, in bytes, of any supported format
const MAX_TILE_BYTES: usize = 32;

/// The per-tile byte layouts a [`TiledRaster`] can be stored in
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TileFormat {
    /// 16 colors, two pixels per byte
    Packed4bpp,
    /// 4 colors, two interleaved bit planes per row
    Planar2bpp,
}

impl TileFormat {
    pub const fn bits_per_pixel(self) -> usize {
        match self {
            Self::Packed4bpp => 4,
            Self::Planar2bpp => 2,
        }
    }

    pub const fn bytes_per_tile(self) -> usize {
        self.bits_per_pixel() * TILE_SIZE
    }

    /// Number of palette entries a tile of this format can address
    pub const fn max_colors(self) -> usize {
        1 << self.bits_per_pixel()
    }

    fn decode_tile(self, src: &[u8], tile: &mut TileSamples) {
        match self {
            Self::Packed4bpp => packed::decode_tile(src, tile),
            Self::Planar2bpp => planar::decode_tile(src, tile),
        }
    }

    fn encode_tile(self, tile: &TileSamples, dst: &mut [u8]) {
        match self {
            Self::Packed4bpp => packed::encode_tile(tile, dst),
            Self::Planar2bpp => planar::encode_tile(tile, dst),
        }
    }

    /// Check that `palette` is addressable by this format, and pad it out to
    /// the full number of entries
    fn fit_palette(self, palette: &Palette) -> Result<Palette, GfxError> {
        let max = self.max_colors();
        if palette.len() > max {
            return Err(GfxError::PaletteTooLarge {
                format: self,
                len: palette.len(),
                max,
            });
        }

        Ok(palette.padded_to(max))
    }

    /// Build a palette for the distinct `colors` of an image, returning it
    /// along with the palette index assigned to each of the `colors`
    fn palette_for_colors(self, colors: &[Color]) -> Result<(Palette, SmallVec<[u8; 16]>), GfxError> {
        let max = self.max_colors();
        if colors.len() > max {
            return Err(GfxError::PaletteTooLarge {
                format: self,
                len: colors.len(),
                max,
            });
        }

        Ok(match self {
            Self::Packed4bpp => packed::palette_for_colors(colors),
            Self::Planar2bpp => planar::palette_for_colors(colors),
        })
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Packed4bpp => write!(f, "4bpp packed"),
            Self::Planar2bpp => write!(f, "2bpp planar"),
        }
    }
}

/// A grid of 8x8 tiles of palette indices.
///
/// Rasters are built by decoding tile data ([`decode`]) or by quantizing an
/// image ([`from_image`]), and are read-only afterwards. Every sub-raster
/// ([`subimage_from_tile_range`], [`subimage_from_tile_rect`], [`frame`]) is an
/// independent copy with its own pixels and palette.
///
/// [`decode`]: TiledRaster::decode
/// [`from_image`]: TiledRaster::from_image
/// [`subimage_from_tile_range`]: TiledRaster::subimage_from_tile_range
/// [`subimage_from_tile_rect`]: TiledRaster::subimage_from_tile_rect
/// [`frame`]: TiledRaster::frame
#[derive(Debug, Clone)]
pub struct TiledRaster {
    format: TileFormat,
    width_in_tiles: usize,
    height_in_tiles: usize,
    column_mode: bool,
    palette: Palette,
    // row-major, one palette index per pixel
    pixels: Vec<u8>,
    // default (width, height) of a frame, in tiles
    frame_size: Option<(usize, usize)>,
    // [low, high]
    bit_planes: OnceCell<[GrayImage; 2]>,
}

impl TiledRaster {
    fn blank(
        format: TileFormat,
        width_in_tiles: usize,
        height_in_tiles: usize,
        palette: Palette,
        column_mode: bool,
    ) -> Result<Self, GfxError> {
        let too_large = || GfxError::GridTooLarge {
            width_in_tiles,
            height_in_tiles,
        };
        let len = width_in_tiles
            .checked_mul(height_in_tiles)
            .and_then(|tiles| tiles.checked_mul(TILE_SIZE * TILE_SIZE))
            .ok_or_else(too_large)?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| too_large())?;
        pixels.resize(len, 0);

        Ok(Self {
            format,
            width_in_tiles,
            height_in_tiles,
            column_mode,
            palette,
            pixels,
            frame_size: None,
            bit_planes: OnceCell::new(),
        })
    }

    /// Decode `bytes` of tile data into a `width_in_tiles` by `height_in_tiles` raster.
    ///
    /// `palette` may be shorter than the format's color count; it is padded with black.
    /// If `bytes` holds fewer tiles than the grid, the remaining tiles are left
    /// at index 0. Bytes past the end of the grid are ignored.
    /// A grid whose pixel count does not fit in memory is a [`GfxError::GridTooLarge`].
    pub fn decode(
        bytes: &[u8],
        width_in_tiles: usize,
        height_in_tiles: usize,
        palette: &Palette,
        column_mode: bool,
        format: TileFormat,
    ) -> Result<Self, GfxError> {
        let palette = format.fit_palette(palette)?;
        let mut raster = Self::blank(format, width_in_tiles, height_in_tiles, palette, column_mode)?;

        let tile_bytes = format.bytes_per_tile();
        let expected = raster.tile_count() * tile_bytes;
        if bytes.len() != expected {
            debug!(
                "decoding {} bytes of {} tile data into a grid that holds {}",
                bytes.len(),
                format,
                expected
            );
        }

        let mut tile = TileSamples::default();
        for (index, chunk) in bytes.chunks(tile_bytes).take(raster.tile_count()).enumerate() {
            // a short final tile reads its missing bytes as zero
            let mut buf = [0u8; MAX_TILE_BYTES];
            buf[..chunk.len()].copy_from_slice(chunk);

            format.decode_tile(&buf[..tile_bytes], &mut tile);
            let (tx, ty) = raster.tile_position(index);
            raster.put_tile(tx, ty, &tile);
        }

        Ok(raster)
    }

    /// Quantize an image into a raster, deriving the palette from the colors
    /// the image uses.
    ///
    /// Colors are collected in scan order. `Packed4bpp` keeps that order;
    /// `Planar2bpp` sorts them from light to dark, with pure white pinned to
    /// index 0 and pure black pinned to index 3.
    pub fn from_image(
        image: &RgbaImage,
        format: TileFormat,
        column_mode: bool,
    ) -> Result<Self, GfxError> {
        let (width, height) = image.dimensions();
        if width as usize % TILE_SIZE != 0 || height as usize % TILE_SIZE != 0 {
            return Err(GfxError::UnalignedImage { width, height });
        }

        let mut seen = HashSet::new();
        let mut colors: Vec<Color> = Vec::new();
        for px in image.pixels() {
            let color = Color::from_rgba(*px);
            if seen.insert(color) {
                colors.push(color);
            }
        }

        let (palette, indices) = format.palette_for_colors(&colors)?;
        trace!("{} palette for image: {}", format, palette);

        let mut raster = Self::blank(
            format,
            width as usize / TILE_SIZE,
            height as usize / TILE_SIZE,
            palette,
            column_mode,
        )?;
        for (x, y, px) in image.enumerate_pixels() {
            let color = Color::from_rgba(*px);
            // every color of the image was collected above
            if let Some(pos) = colors.iter().position(|&c| c == color) {
                raster.set_pixel(x as usize, y as usize, indices[pos]);
            }
        }

        Ok(raster)
    }

    /// Encode the raster into its format's tile layout.
    ///
    /// The output is always `tile_count() * bytes_per_tile()` bytes long.
    pub fn encode(&self) -> Vec<u8> {
        let tile_bytes = self.format.bytes_per_tile();
        let mut out = vec![0u8; self.tile_count() * tile_bytes];

        for (index, dst) in out.chunks_exact_mut(tile_bytes).enumerate() {
            let (tx, ty) = self.tile_position(index);
            self.format.encode_tile(&self.tile(tx, ty), dst);
        }

        out
    }

    /// Render the raster to an RGBA image through its palette
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            let index = self.pixel(x as usize, y as usize);
            self.palette
                .get(index as usize)
                .unwrap_or(Color::BLACK)
                .to_rgba()
        })
    }

    /// Grid position `(tile_x, tile_y)` of the tile numbered `index`
    pub fn tile_position(&self, index: usize) -> (usize, usize) {
        if self.column_mode {
            (index / self.height_in_tiles, index % self.height_in_tiles)
        } else {
            (index % self.width_in_tiles, index / self.width_in_tiles)
        }
    }

    /// Copy the tiles numbered `from..to` into a new raster one tile high
    pub fn subimage_from_tile_range(&self, from: usize, to: usize) -> Result<Self, GfxError> {
        let count = self.tile_count();
        if from >= to || to > count {
            return Err(GfxError::TileRangeOutOfBounds { from, to, count });
        }

        let mut strip = Self::blank(
            self.format,
            to - from,
            1,
            self.palette.clone(),
            self.column_mode,
        )?;
        for (dst_x, index) in (from..to).enumerate() {
            let (tx, ty) = self.tile_position(index);
            strip.put_tile(dst_x, 0, &self.tile(tx, ty));
        }

        Ok(strip)
    }

    /// Copy the `width` by `height` tile rectangle at tile `(x, y)` into a new raster
    pub fn subimage_from_tile_rect(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, GfxError> {
        let fits = width > 0
            && height > 0
            && x.checked_add(width).map_or(false, |r| r <= self.width_in_tiles)
            && y.checked_add(height).map_or(false, |b| b <= self.height_in_tiles);
        if !fits {
            return Err(GfxError::TileRectOutOfBounds {
                x,
                y,
                width,
                height,
                grid_width: self.width_in_tiles,
                grid_height: self.height_in_tiles,
            });
        }

        let mut rect = Self::blank(
            self.format,
            width,
            height,
            self.palette.clone(),
            self.column_mode,
        )?;
        for ty in 0..height {
            for tx in 0..width {
                rect.put_tile(tx, ty, &self.tile(x + tx, y + ty));
            }
        }

        Ok(rect)
    }

    /// Set the default frame size used by [`frame`](TiledRaster::frame)
    pub fn set_frame_size(&mut self, width: usize, height: usize) -> Result<(), GfxError> {
        self.check_frame_size(width, height)?;
        self.frame_size = Some((width, height));
        Ok(())
    }

    pub fn frame_size(&self) -> Option<(usize, usize)> {
        self.frame_size
    }

    /// Number of frames of the default frame size, if one is set
    pub fn frame_count(&self) -> Option<usize> {
        self.frame_size
            .map(|(w, h)| (self.width_in_tiles / w) * (self.height_in_tiles / h))
    }

    /// Extract frame `index` using the default frame size
    pub fn frame(&self, index: usize) -> Result<Self, GfxError> {
        let (width, height) = self.frame_size.ok_or(GfxError::FrameSizeUnset)?;
        self.frame_with_size(index, width, height)
    }

    /// Split the raster into frames of `width` by `height` tiles, and extract frame `index`.
    ///
    /// Frames are numbered left to right, wrapping to the next row of frames
    /// every `width_in_tiles / width` frames.
    pub fn frame_with_size(
        &self,
        index: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, GfxError> {
        self.check_frame_size(width, height)?;

        let per_row = self.width_in_tiles / width;
        let count = per_row * (self.height_in_tiles / height);
        if index >= count {
            return Err(GfxError::FrameOutOfRange { index, count });
        }

        let (fx, fy) = (index % per_row, index / per_row);
        self.subimage_from_tile_rect(fx * width, fy * height, width, height)
    }

    fn check_frame_size(&self, width: usize, height: usize) -> Result<(), GfxError> {
        if width == 0 || height == 0 {
            return Err(GfxError::EmptyFrameSize);
        }
        if self.width_in_tiles % width != 0 || self.height_in_tiles % height != 0 {
            return Err(GfxError::FrameSizeMismatch {
                frame_width: width,
                frame_height: height,
                width: self.width_in_tiles,
                height: self.height_in_tiles,
            });
        }

        Ok(())
    }

    #[inline]
    pub fn format(&self) -> TileFormat {
        self.format
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[inline]
    pub fn column_mode(&self) -> bool {
        self.column_mode
    }

    #[inline]
    pub fn width_in_tiles(&self) -> usize {
        self.width_in_tiles
    }

    #[inline]
    pub fn height_in_tiles(&self) -> usize {
        self.height_in_tiles
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.width_in_tiles * self.height_in_tiles
    }

    /// width in pixels
    #[inline]
    pub fn width(&self) -> usize {
        self.width_in_tiles * TILE_SIZE
    }

    /// height in pixels
    #[inline]
    pub fn height(&self) -> usize {
        self.height_in_tiles * TILE_SIZE
    }

    /// Palette index of the pixel at `(x, y)`
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the raster. See [`get_pixel`](TiledRaster::get_pixel)
    /// for a checked version.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width() + x]
    }

    /// Palette index of the pixel at `(x, y)`, or `None` if it is outside the raster
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width() && y < self.height() {
            Some(self.pixel(x, y))
        } else {
            None
        }
    }

    /// All palette indices, row by row
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn set_pixel(&mut self, x: usize, y: usize, index: u8) {
        let width = self.width();
        self.pixels[y * width + x] = index;
        // derived views no longer match the pixels
        self.bit_planes.take();
    }

    fn tile(&self, tile_x: usize, tile_y: usize) -> TileSamples {
        let mut tile = TileSamples::default();
        let (x0, y0) = (tile_x * TILE_SIZE, tile_y * TILE_SIZE);

        for (row, samples) in tile.iter_mut().enumerate() {
            let start = (y0 + row) * self.width() + x0;
            samples.copy_from_slice(&self.pixels[start..start + TILE_SIZE]);
        }

        tile
    }

    fn put_tile(&mut self, tile_x: usize, tile_y: usize, tile: &TileSamples) {
        let (x0, y0) = (tile_x * TILE_SIZE, tile_y * TILE_SIZE);
        let width = self.width();

        for (row, samples) in tile.iter().enumerate() {
            let start = (y0 + row) * width + x0;
            self.pixels[start..start + TILE_SIZE].copy_from_slice(samples);
        }
        self.bit_planes.take();
    }
}

/// Rasters are equal when their layout, palette, and pixels match.
/// Frame size and cached views are not compared.
impl PartialEq for TiledRaster {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
            && self.width_in_tiles == other.width_in_tiles
            && self.height_in_tiles == other.height_in_tiles
            && self.column_mode == other.column_mode
            && self.palette == other.palette
            && self.pixels == other.pixels
    }
}

impl Eq for TiledRaster {}

/// Decode tile data into a raster.
///
/// This is a convenience function for [`TiledRaster::decode`].
pub fn decode_tiled_raster(
    bytes: &[u8],
    width_in_tiles: usize,
    height_in_tiles: usize,
    palette: &Palette,
    column_mode: bool,
    format: TileFormat,
) -> Result<TiledRaster, GfxError> {
    TiledRaster::decode(
        bytes,
        width_in_tiles,
        height_in_tiles,
        palette,
        column_mode,
        format,
    )
}

/// Encode a raster back into its tile data
pub fn encode_tiled_raster(raster: &TiledRaster) -> Vec<u8> {
    raster.encode()
}

pub fn extract_tile_range(
    raster: &TiledRaster,
    from: usize,
    to: usize,
) -> Result<TiledRaster, GfxError> {
    raster.subimage_from_tile_range(from, to)
}

pub fn extract_tile_rect(
    raster: &TiledRaster,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> Result<TiledRaster, GfxError> {
    raster.subimage_from_tile_rect(x, y, width, height)
}

pub fn extract_frame(
    raster: &TiledRaster,
    index: usize,
    frame_width: usize,
    frame_height: usize,
) -> Result<TiledRaster, GfxError> {
    raster.frame_with_size(index, frame_width, frame_height)
}
