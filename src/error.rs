// Error type shared by the encoder, decoder and frame store.
//
// Every variant names one distinct failure condition so callers (and tests)
// can match on the kind instead of a message.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ZmbvError>;

/// Errors produced by the ZMBV codec.
#[derive(Debug, Error)]
pub enum ZmbvError {
    /// Unknown bits-per-pixel value or wire format code.
    #[error("unsupported pixel format: {0:#04x}")]
    UnsupportedFormat(u32),

    /// A frame or work buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes of frame storage")]
    AllocationFailure { bytes: usize },

    /// Keyframe header carries a version other than the supported one.
    #[error("unsupported stream version {high}.{low}")]
    VersionMismatch { high: u8, low: u8 },

    /// Keyframe header names a compression mode this codec does not know.
    #[error("unsupported compression mode: {0}")]
    UnsupportedCompression(u8),

    /// The record is truncated, oversized or internally inconsistent.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The deflate/inflate stream reported an error or did not fully flush.
    #[error("compression stream failure: {0}")]
    CompressionFailure(String),

    /// Frame dimensions are zero or exceed the supported maximum.
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// The call is not valid in the codec's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
}

impl ZmbvError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedFrame(msg.into())
    }
}

impl From<flate2::CompressError> for ZmbvError {
    fn from(e: flate2::CompressError) -> Self {
        Self::CompressionFailure(e.to_string())
    }
}

impl From<flate2::DecompressError> for ZmbvError {
    fn from(e: flate2::DecompressError) -> Self {
        Self::CompressionFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_condition() {
        let e = ZmbvError::VersionMismatch { high: 1, low: 0 };
        assert_eq!(e.to_string(), "unsupported stream version 1.0");

        let e = ZmbvError::UnsupportedFormat(0x07);
        assert_eq!(e.to_string(), "unsupported pixel format: 0x07");

        let e = ZmbvError::malformed("record too short");
        assert!(matches!(e, ZmbvError::MalformedFrame(ref m) if m == "record too short"));
    }
}
