// Frame-level encoder and decoder.
//
// - `entropy`: zlib / stored stage between the work buffer and the wire
// - `encoder`: FrameEncoder: raw scanlines -> wire records
// - `decoder`: FrameDecoder: wire records -> reconstructed frames

pub mod decoder;
pub mod encoder;
pub mod entropy;

pub use decoder::FrameDecoder;
pub use encoder::{EncodeOptions, FrameEncoder};
pub use entropy::{DeflateStage, EntropyStage, InflateStage, StoredStage};

use crate::format::header::KEYFRAME_HEADER_LEN;
use crate::format::{FrameTag, KeyframeHeader, PixelFormat};
use crate::motion::DeltaStats;

/// Summary of one encoded or decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub tag: FrameTag,
    /// Present on keyframes.
    pub header: Option<KeyframeHeader>,
    pub format: PixelFormat,
    /// Uncompressed payload size (palette, vectors, residuals or raw rows).
    pub work_size: usize,
    /// Payload bytes on the wire after the tag and header.
    pub payload_size: usize,
    /// Block statistics of a delta frame.
    pub delta: Option<DeltaStats>,
}

impl FrameInfo {
    pub fn is_keyframe(&self) -> bool {
        self.tag.is_keyframe()
    }

    /// Whether the record carried a full palette or a palette diff.
    pub fn has_palette(&self) -> bool {
        if self.is_keyframe() {
            self.format.is_palettized()
        } else {
            self.tag.contains(FrameTag::DELTA_PALETTE)
        }
    }

    /// Total record size: tag, header and payload.
    pub fn record_size(&self) -> usize {
        1 + self.header.map_or(0, |_| KEYFRAME_HEADER_LEN) + self.payload_size
    }
}
