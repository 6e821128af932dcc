// Reconstructed frame -> packed 24-bit color.
//
// 15/16bpp channels are widened by bit replication so full-scale inputs map
// to 255; 8bpp goes through the palette; 32bpp keeps the low three bytes.
// `ExportOptions::dib()` gives the classic Windows DIB layout: BGR, bottom
// row first, every row padded to a multiple of 4 bytes.

use crate::codec::FrameDecoder;
use crate::error::{Result, ZmbvError};
use crate::format::{Palette, PixelFormat};

/// Channel order of each output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// Row order of the output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    TopDown,
    BottomUp,
}

/// Layout of exported frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportOptions {
    pub channel_order: ChannelOrder,
    pub orientation: Orientation,
    /// Pad each row with zeros to a multiple of 4 bytes.
    pub align_rows: bool,
}

impl ExportOptions {
    /// BGR, bottom-up, 4-byte aligned rows.
    pub fn dib() -> Self {
        Self {
            channel_order: ChannelOrder::Bgr,
            orientation: Orientation::BottomUp,
            align_rows: true,
        }
    }
}

/// Bytes per output row.
pub fn row_stride(width: usize, options: &ExportOptions) -> usize {
    let packed = width * 3;
    if options.align_rows {
        (packed + 3) & !3
    } else {
        packed
    }
}

/// RGB value of the pixel stored at `bytes[..format.bytes_per_pixel()]`.
#[inline]
pub fn expand_pixel(format: PixelFormat, palette: &Palette, bytes: &[u8]) -> [u8; 3] {
    match format {
        PixelFormat::Bpp8 => palette.entry(bytes[0]),
        PixelFormat::Bpp15 => {
            let c = u16::from_le_bytes([bytes[0], bytes[1]]) as u32;
            [
                (((c & 0x7c00) * 0x21) >> 12) as u8,
                (((c & 0x03e0) * 0x21) >> 7) as u8,
                (((c & 0x001f) * 0x21) >> 2) as u8,
            ]
        }
        PixelFormat::Bpp16 => {
            let c = u16::from_le_bytes([bytes[0], bytes[1]]) as u32;
            [
                (((c & 0xf800) * 0x21) >> 13) as u8,
                (((c & 0x07e0) * 0x41) >> 9) as u8,
                (((c & 0x001f) * 0x21) >> 2) as u8,
            ]
        }
        PixelFormat::Bpp32 => [bytes[2], bytes[1], bytes[0]],
    }
}

/// Convert one scanline, appending `width * 3` bytes to `out`.
pub fn export_row(
    format: PixelFormat,
    palette: &Palette,
    row: &[u8],
    order: ChannelOrder,
    out: &mut Vec<u8>,
) {
    for px in row.chunks_exact(format.bytes_per_pixel()) {
        let [r, g, b] = expand_pixel(format, palette, px);
        match order {
            ChannelOrder::Rgb => out.extend_from_slice(&[r, g, b]),
            ChannelOrder::Bgr => out.extend_from_slice(&[b, g, r]),
        }
    }
}

/// Append the decoder's current frame to `out`. Returns the bytes written.
pub fn export_frame(
    decoder: &FrameDecoder,
    options: &ExportOptions,
    out: &mut Vec<u8>,
) -> Result<usize> {
    let Some(format) = decoder.format() else {
        return Err(ZmbvError::InvalidOperation("no frame has been decoded"));
    };
    let height = decoder.height();
    let stride = row_stride(decoder.width(), options);
    let pad = stride - decoder.width() * 3;
    out.reserve(stride * height);

    let start = out.len();
    for i in 0..height {
        let y = match options.orientation {
            Orientation::TopDown => i,
            Orientation::BottomUp => height - 1 - i,
        };
        let Some(row) = decoder.line(y) else {
            return Err(ZmbvError::InvalidOperation("no frame has been decoded"));
        };
        export_row(format, decoder.palette(), row, options.channel_order, out);
        out.resize(out.len() + pad, 0);
    }
    Ok(out.len() - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodeOptions, FrameEncoder};

    #[test]
    fn strides() {
        assert_eq!(row_stride(5, &ExportOptions::default()), 15);
        for w in 1..=8 {
            // Same as padding each row by `width & 3` bytes.
            assert_eq!(row_stride(w, &ExportOptions::dib()), w * 3 + (w & 3));
        }
    }

    #[test]
    fn high_color_expansion() {
        let pal = Palette::default();
        assert_eq!(expand_pixel(PixelFormat::Bpp15, &pal, &[0xff, 0x7f]), [255, 255, 255]);
        assert_eq!(expand_pixel(PixelFormat::Bpp16, &pal, &[0xff, 0xff]), [255, 255, 255]);
        assert_eq!(expand_pixel(PixelFormat::Bpp16, &pal, &[0x00, 0x00]), [0, 0, 0]);
        // Pure 16bpp green, 6 bits.
        assert_eq!(expand_pixel(PixelFormat::Bpp16, &pal, &[0xe0, 0x07]), [0, 255, 0]);
        // 15bpp red = 1 -> (1 * 33) >> 2.
        assert_eq!(expand_pixel(PixelFormat::Bpp15, &pal, &[0x00, 0x04]), [8, 0, 0]);
        assert_eq!(expand_pixel(PixelFormat::Bpp32, &pal, &[1, 2, 3, 4]), [3, 2, 1]);
    }

    #[test]
    fn palette_lookup() {
        let mut pal = Palette::default();
        pal.set_entry(9, [10, 20, 30]);
        assert_eq!(expand_pixel(PixelFormat::Bpp8, &pal, &[9]), [10, 20, 30]);
    }

    #[test]
    fn dib_layout_of_decoded_frame() {
        let mut enc = FrameEncoder::new(2, 2, EncodeOptions::default()).unwrap();
        // Rows top to bottom: [B=1,G=2,R=3][4,5,6] / [7,8,9][10,11,12].
        let pixels = [1, 2, 3, 0, 4, 5, 6, 0, 7, 8, 9, 0, 10, 11, 12, 0];
        let mut record = Vec::new();
        enc.encode_frame(PixelFormat::Bpp32, None, &pixels, false, &mut record)
            .unwrap();
        let mut dec = FrameDecoder::new(2, 2).unwrap();

        let mut out = Vec::new();
        assert!(export_frame(&dec, &ExportOptions::dib(), &mut out).is_err());
        dec.decode_frame(&record).unwrap();

        let n = export_frame(&dec, &ExportOptions::dib(), &mut out).unwrap();
        assert_eq!(n, 16);
        assert_eq!(out, [7, 8, 9, 10, 11, 12, 0, 0, 1, 2, 3, 4, 5, 6, 0, 0]);

        out.clear();
        export_frame(&dec, &ExportOptions::default(), &mut out).unwrap();
        assert_eq!(out, [3, 2, 1, 6, 5, 4, 9, 8, 7, 12, 11, 10]);
    }
}
