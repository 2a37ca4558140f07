mod decode;
mod encode;
mod errors;
pub mod format;
pub mod palette;
pub mod raster;

pub use decode::{decode, lz_info, Decoder};
pub use encode::{compress, EncoderBuilder, LzssBackend, LzssSettings};
pub use errors::{GfxError, LzError};
pub use format::{LzHeader, LzVariant};
pub use palette::{Color, Palette};
pub use raster::{
    decode_tiled_raster, encode_tiled_raster, extract_frame, extract_tile_range,
    extract_tile_rect, BitPlane, TileFormat, TiledRaster, TILE_SIZE,
};
