// Per-frame tag byte and keyframe header encoding/decoding.
//
// Layout of one record:
//   tag (1 byte)
//   keyframe header (6 bytes, keyframes only)
//   payload (deflate or stored work buffer)

use bitflags::bitflags;

use super::pixel::PixelFormat;
use crate::error::{Result, ZmbvError};

// ---------------------------------------------------------------------------
// Version and compression constants
// ---------------------------------------------------------------------------

pub const VERSION_HIGH: u8 = 0;
pub const VERSION_LOW: u8 = 1;

/// Size of the keyframe header in bytes.
pub const KEYFRAME_HEADER_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Tag byte
// ---------------------------------------------------------------------------

bitflags! {
    /// First byte of every record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameTag: u8 {
        /// Record is a self-contained keyframe with a header.
        const KEYFRAME = 1 << 0;
        /// Delta record carries a palette XOR diff.
        const DELTA_PALETTE = 1 << 1;
    }
}

impl FrameTag {
    /// Parse a tag byte, rejecting reserved bits.
    pub fn parse(byte: u8) -> Result<Self> {
        Self::from_bits(byte)
            .ok_or_else(|| ZmbvError::malformed(format!("reserved tag bits set: {byte:#04x}")))
    }

    pub fn is_keyframe(self) -> bool {
        self.contains(Self::KEYFRAME)
    }
}

// ---------------------------------------------------------------------------
// Compression mode
// ---------------------------------------------------------------------------

/// Payload compression declared in the keyframe header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMode {
    /// Work buffer stored as-is.
    None,
    /// Work buffer deflated (zlib wrapper), one stream per keyframe interval.
    #[default]
    Zlib,
}

impl CompressionMode {
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Zlib),
            other => Err(ZmbvError::UnsupportedCompression(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zlib => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Keyframe header
// ---------------------------------------------------------------------------

/// Parsed keyframe header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyframeHeader {
    pub compression: CompressionMode,
    pub format: PixelFormat,
    pub block_width: u8,
    pub block_height: u8,
}

impl KeyframeHeader {
    /// Serialize with the supported version.
    pub fn encode(&self) -> [u8; KEYFRAME_HEADER_LEN] {
        [
            VERSION_HIGH,
            VERSION_LOW,
            self.compression.code(),
            self.format.code(),
            self.block_width,
            self.block_height,
        ]
    }

    /// Parse and validate a header.
    ///
    /// Checks run in wire order: version, compression, format, block size.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(raw) = bytes.get(..KEYFRAME_HEADER_LEN) else {
            return Err(ZmbvError::malformed(format!(
                "keyframe header truncated: {} of {KEYFRAME_HEADER_LEN} bytes",
                bytes.len()
            )));
        };
        if raw[0] != VERSION_HIGH || raw[1] != VERSION_LOW {
            return Err(ZmbvError::VersionMismatch {
                high: raw[0],
                low: raw[1],
            });
        }
        let compression = CompressionMode::from_code(raw[2])?;
        let format = PixelFormat::from_code(raw[3])?;
        if raw[4] == 0 || raw[5] == 0 {
            return Err(ZmbvError::malformed(format!(
                "zero block size {}x{}",
                raw[4], raw[5]
            )));
        }
        Ok(Self {
            compression,
            format,
            block_width: raw[4],
            block_height: raw[5],
        })
    }
}
