// Frame encoder.
//
// FrameEncoder turns raw frames into wire records:
//   - prepare_frame() decides keyframe vs delta and stages the palette
//   - write_line()/write_lines() fill the current buffer
//   - finish_frame() runs the block search (delta) or copies rows
//     (keyframe), pushes the work buffer through the entropy stage and
//     appends tag + header + payload to the caller's Vec
//
// Stream state (palette, previous frame, zlib history) only advances when a
// frame is finished. A prepared frame that is abandoned leaves the decoder's
// view intact; if it was a keyframe, the next frame is forced to be one.

use log::{debug, trace};

use crate::error::{Result, ZmbvError};
use crate::format::{CompressionMode, FrameTag, KeyframeHeader, Palette, PixelFormat};
use crate::motion::delta;
use crate::motion::{BlockMatcher, FrameStore, SearchConfig};

use super::FrameInfo;
use super::entropy::{self, DEFAULT_LEVEL, EntropyStage};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`FrameEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Deflate level (0-9).
    pub level: u32,
    /// Wire compression mode.
    pub compression: CompressionMode,
    /// Block width in pixels (nonzero).
    pub block_width: u8,
    /// Block height in pixels (nonzero).
    pub block_height: u8,
    /// Vector search profile.
    pub search: SearchConfig,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            compression: CompressionMode::Zlib,
            block_width: 16,
            block_height: 16,
            search: SearchConfig::REFERENCE,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameEncoder
// ---------------------------------------------------------------------------

/// A frame between `prepare_frame` and `finish_frame`.
#[derive(Debug)]
struct PendingFrame {
    tag: FrameTag,
    header: Option<KeyframeHeader>,
    format: PixelFormat,
    /// Palette the stream adopts once the frame is finished.
    palette: Option<Palette>,
    lines: usize,
}

/// ZMBV encoder for one stream.
///
/// # Example
/// ```
/// use zmbv::{EncodeOptions, FrameEncoder, PixelFormat};
///
/// let mut enc = FrameEncoder::new(4, 4, EncodeOptions::default()).unwrap();
/// let mut record = Vec::new();
/// let info = enc
///     .encode_frame(PixelFormat::Bpp16, None, &[0u8; 32], false, &mut record)
///     .unwrap();
/// assert!(info.is_keyframe());
/// assert_eq!(info.record_size(), record.len());
/// ```
pub struct FrameEncoder {
    options: EncodeOptions,
    store: FrameStore,
    matcher: BlockMatcher,
    entropy: Box<dyn EntropyStage>,
    palette: Palette,
    pending: Option<PendingFrame>,
    force_keyframe: bool,
    frames: u64,
}

impl std::fmt::Debug for FrameEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameEncoder")
            .field("options", &self.options)
            .field("store", &self.store)
            .field("frames", &self.frames)
            .finish()
    }
}

impl FrameEncoder {
    /// Create an encoder for `width x height` frames.
    pub fn new(width: usize, height: usize, options: EncodeOptions) -> Result<Self> {
        if options.block_width == 0 || options.block_height == 0 {
            return Err(ZmbvError::InvalidOperation("block size must be nonzero"));
        }
        Ok(Self {
            store: FrameStore::new(width, height)?,
            matcher: BlockMatcher::new(options.search),
            entropy: entropy::encoder_stage(options.compression, options.level),
            palette: Palette::default(),
            pending: None,
            force_keyframe: true,
            frames: 0,
            options,
        })
    }

    /// Change frame dimensions. The next frame is a keyframe.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        self.store.resize(width, height)?;
        self.pending = None;
        self.force_keyframe = true;
        Ok(())
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    pub fn width(&self) -> usize {
        self.store.width()
    }

    pub fn height(&self) -> usize {
        self.store.height()
    }

    /// Active pixel format, if any frame has been prepared.
    pub fn format(&self) -> Option<PixelFormat> {
        self.store.format()
    }

    /// Palette as last transmitted.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Frames finished so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames
    }

    /// Start a frame.
    ///
    /// A format change reallocates the buffers and forces a keyframe. For
    /// 8bpp frames `palette` is the frame's palette; `None` keeps the
    /// current one on delta frames and sends an all-black palette on
    /// keyframes.
    pub fn prepare_frame(
        &mut self,
        format: PixelFormat,
        palette: Option<&Palette>,
        force_keyframe: bool,
    ) -> Result<()> {
        if let Some(abandoned) = self.pending.take() {
            if abandoned.tag.is_keyframe() {
                self.force_keyframe = true;
            }
        }

        let mut keyframe = force_keyframe || self.force_keyframe;
        if self.store.format() != Some(format) {
            debug!("encoder: format change to {format}, forcing keyframe");
            self.store.setup(
                format,
                self.options.block_width as usize,
                self.options.block_height as usize,
            )?;
            keyframe = true;
        }

        let work = self.store.work_mut();
        work.clear();

        let pending = if keyframe {
            let header = KeyframeHeader {
                compression: self.entropy.compression(),
                format,
                block_width: self.options.block_width,
                block_height: self.options.block_height,
            };
            let next = palette.cloned().unwrap_or_default();
            if format.is_palettized() {
                work.extend_from_slice(next.as_bytes());
            }
            PendingFrame {
                tag: FrameTag::KEYFRAME,
                header: Some(header),
                format,
                palette: format.is_palettized().then_some(next),
                lines: 0,
            }
        } else {
            let mut tag = FrameTag::empty();
            let mut adopt = None;
            if let Some(next) = palette.filter(|p| format.is_palettized() && **p != self.palette) {
                self.palette.write_diff(next, work);
                tag |= FrameTag::DELTA_PALETTE;
                adopt = Some(next.clone());
            }
            PendingFrame {
                tag,
                header: None,
                format,
                palette: adopt,
                lines: 0,
            }
        };
        self.pending = Some(pending);
        Ok(())
    }

    /// Copy one scanline into the frame in progress. Bytes beyond the row
    /// length are ignored.
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        let height = self.store.height();
        let row_bytes = self.store.row_bytes();
        let Some(pending) = self.pending.as_mut() else {
            return Err(ZmbvError::InvalidOperation("no frame in progress"));
        };
        if pending.lines >= height {
            return Err(ZmbvError::InvalidOperation("frame already has every line"));
        }
        if line.len() < row_bytes {
            return Err(ZmbvError::InvalidOperation("line shorter than the frame width"));
        }
        let index = pending.lines;
        pending.lines += 1;
        if let Some(row) = self.store.row_mut(index) {
            row.copy_from_slice(&line[..row_bytes]);
        }
        Ok(())
    }

    /// Copy consecutive scanlines (`width * pixel_size` bytes each).
    pub fn write_lines(&mut self, lines: &[u8]) -> Result<()> {
        let row_bytes = self.store.row_bytes();
        if row_bytes == 0 {
            return Err(ZmbvError::InvalidOperation("no frame in progress"));
        }
        if lines.len() % row_bytes != 0 {
            return Err(ZmbvError::InvalidOperation("line shorter than the frame width"));
        }
        for line in lines.chunks_exact(row_bytes) {
            self.write_line(line)?;
        }
        Ok(())
    }

    /// Encode the frame in progress and append the record to `out`.
    ///
    /// Lines that were never written keep the contents the buffer had from
    /// two frames earlier.
    pub fn finish_frame(&mut self, out: &mut Vec<u8>) -> Result<FrameInfo> {
        let Some(pending) = self.pending.take() else {
            return Err(ZmbvError::InvalidOperation("finish_frame without prepare_frame"));
        };

        let stats = if pending.tag.is_keyframe() {
            self.store.append_current_rows();
            None
        } else {
            Some(delta::encode_delta(
                &self.matcher,
                pending.format,
                self.store.parts(),
            ))
        };

        let start = out.len();
        out.push(pending.tag.bits());
        if let Some(header) = &pending.header {
            out.extend_from_slice(&header.encode());
            self.entropy.reset();
        }
        let payload_start = out.len();
        if let Err(e) = self.entropy.transform(self.store.work(), out, usize::MAX) {
            out.truncate(start);
            self.force_keyframe = true;
            return Err(e);
        }

        if pending.tag.is_keyframe() {
            self.force_keyframe = false;
        }
        if let Some(palette) = pending.palette {
            self.palette = palette;
        }
        self.store.swap();
        self.frames += 1;

        let info = FrameInfo {
            tag: pending.tag,
            header: pending.header,
            format: pending.format,
            work_size: self.store.work().len(),
            payload_size: out.len() - payload_start,
            delta: stats,
        };
        trace!(
            "encoded frame {}: tag {:#04x}, work {} bytes, payload {} bytes",
            self.frames,
            info.tag.bits(),
            info.work_size,
            info.payload_size
        );
        Ok(info)
    }

    /// Encode a whole frame of `height` rows of `width * pixel_size` bytes.
    pub fn encode_frame(
        &mut self,
        format: PixelFormat,
        palette: Option<&Palette>,
        pixels: &[u8],
        force_keyframe: bool,
        out: &mut Vec<u8>,
    ) -> Result<FrameInfo> {
        let expected = self.store.width() * self.store.height() * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(ZmbvError::InvalidOperation("pixel buffer does not match frame size"));
        }
        self.prepare_frame(format, palette, force_keyframe)?;
        self.write_lines(pixels)?;
        self.finish_frame(out)
    }
}
