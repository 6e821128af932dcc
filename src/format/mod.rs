// Wire-level building blocks of the ZMBV format.
//
// - `pixel`:   Pixel formats, wire codes, record size bound
// - `palette`: 256-entry RGB palette with XOR-diff transport
// - `header`:  Tag byte flags and the keyframe header

pub mod header;
pub mod palette;
pub mod pixel;

pub use header::{CompressionMode, FrameTag, KeyframeHeader, VERSION_HIGH, VERSION_LOW};
pub use palette::{PALETTE_BYTES, Palette};
pub use pixel::{PixelFormat, max_frame_size};
