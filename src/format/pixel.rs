// Pixel formats understood by the codec and their wire codes.

use crate::error::{Result, ZmbvError};

/// Number of palette entries carried by palettized formats.
pub const PALETTE_ENTRIES: usize = 256;

/// Raster pixel format.
///
/// "No format" (wire code 0x00) is modelled as `Option::<PixelFormat>::None`
/// wherever a codec has not been configured yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit palette indices.
    Bpp8,
    /// 15-bit truecolor, 5:5:5, little-endian.
    Bpp15,
    /// 16-bit truecolor, 5:6:5, little-endian.
    Bpp16,
    /// 32-bit truecolor, B,G,R,x byte order.
    Bpp32,
}

impl PixelFormat {
    /// Every supported format, in wire-code order.
    pub const ALL: [PixelFormat; 4] = [Self::Bpp8, Self::Bpp15, Self::Bpp16, Self::Bpp32];

    /// Map a bits-per-pixel value to a format.
    pub fn from_bpp(bpp: u32) -> Result<Self> {
        match bpp {
            8 => Ok(Self::Bpp8),
            15 => Ok(Self::Bpp15),
            16 => Ok(Self::Bpp16),
            32 => Ok(Self::Bpp32),
            other => Err(ZmbvError::UnsupportedFormat(other)),
        }
    }

    /// Map a keyframe-header format code to a format.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x04 => Ok(Self::Bpp8),
            0x05 => Ok(Self::Bpp15),
            0x06 => Ok(Self::Bpp16),
            0x08 => Ok(Self::Bpp32),
            other => Err(ZmbvError::UnsupportedFormat(other as u32)),
        }
    }

    /// Keyframe-header format code.
    pub fn code(self) -> u8 {
        match self {
            Self::Bpp8 => 0x04,
            Self::Bpp15 => 0x05,
            Self::Bpp16 => 0x06,
            Self::Bpp32 => 0x08,
        }
    }

    /// Nominal bits per pixel.
    pub fn bpp(self) -> u32 {
        match self {
            Self::Bpp8 => 8,
            Self::Bpp15 => 15,
            Self::Bpp16 => 16,
            Self::Bpp32 => 32,
        }
    }

    /// Storage size of one pixel in bytes.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bpp8 => 1,
            Self::Bpp15 | Self::Bpp16 => 2,
            Self::Bpp32 => 4,
        }
    }

    /// Number of palette entries transmitted for this format.
    pub fn palette_entries(self) -> usize {
        match self {
            Self::Bpp8 => PALETTE_ENTRIES,
            _ => 0,
        }
    }

    /// Whether frames in this format carry a palette.
    pub fn is_palettized(self) -> bool {
        self.palette_entries() != 0
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bpp", self.bpp())
    }
}

/// Upper bound on the size of one encoded record for the given geometry.
///
/// Callers that preallocate output buffers use this; it covers the worst case
/// of a keyframe whose deflate output does not shrink.
pub fn max_frame_size(width: usize, height: usize, format: PixelFormat) -> usize {
    let n = format.bytes_per_pixel() * width * height
        + 2 * (1 + width / 8) * (1 + height / 8)
        + 1024;
    n + n / 1000
}
