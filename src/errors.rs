use std::io;

use thiserror::Error;

use crate::format::LzVariant;
use crate::raster::TileFormat;

/// Possible errors that arise from decoding, re-encoding, or slicing a tiled raster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GfxError {
    #[error("palette has {len} colors, but {format} supports at most {max}")]
    PaletteTooLarge {
        format: TileFormat,
        len: usize,
        max: usize,
    },

    #[error(
        "frame of {frame_width}x{frame_height} tiles does not evenly divide a {width}x{height} tile grid"
    )]
    FrameSizeMismatch {
        frame_width: usize,
        frame_height: usize,
        width: usize,
        height: usize,
    },

    #[error("frame size must be at least 1x1 tiles")]
    EmptyFrameSize,

    #[error("no default frame size has been configured for this raster")]
    FrameSizeUnset,

    #[error("frame {index} is out of range; raster holds {count} frames")]
    FrameOutOfRange { index: usize, count: usize },

    #[error("tile range {from}..{to} is invalid for a raster of {count} tiles")]
    TileRangeOutOfBounds { from: usize, to: usize, count: usize },

    #[error(
        "tile rectangle {width}x{height} at ({x}, {y}) does not fit a {grid_width}x{grid_height} tile grid"
    )]
    TileRectOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        grid_width: usize,
        grid_height: usize,
    },

    #[error("a {width_in_tiles}x{height_in_tiles} tile grid is too large to allocate")]
    GridTooLarge {
        width_in_tiles: usize,
        height_in_tiles: usize,
    },

    #[error("image of {width}x{height} pixels is not a whole number of 8x8 tiles")]
    UnalignedImage { width: u32, height: u32 },
}

/// Possible errors that arise from compressing data into an LZSS stream,
/// or reading one back.
#[derive(Error, Debug)]
pub enum LzError {
    #[error("compression tag {0:#04x} is not a known LZSS variant")]
    InvalidTag(u8),

    #[error("decoding {0} streams is not supported")]
    UnsupportedVariant(LzVariant),

    #[error("match displacement {displacement} reaches before the start of {available} decoded bytes")]
    BadLookBack {
        displacement: usize,
        available: usize,
    },

    #[error("invalid LZSS settings: {0}")]
    InvalidSettings(String),

    #[error("input of {0} bytes is too large for a 32-bit size header")]
    TooLarge(usize),

    #[error("{0}")]
    Io(#[from] io::Error),
}
