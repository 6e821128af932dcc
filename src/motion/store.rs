// Bordered frame buffers, the work buffer and the block partition.
//
// Both frame buffers hold `pitch * (height + 2 * BORDER)` pixels where
// `pitch = width + 2 * BORDER`. The border lets any vector with components
// up to BORDER be dereferenced from any block without bounds checks on the
// pixel arithmetic; the slices themselves are still bounds-checked.

use log::debug;

use crate::error::{Result, ZmbvError};
use crate::format::{PALETTE_BYTES, PixelFormat};

/// Border width in pixels on every side of a frame buffer.
pub const BORDER: usize = 16;

/// Largest accepted frame width or height.
pub const MAX_DIMENSION: usize = 16384;

/// Extra bytes on every frame buffer.
const FRAME_SLACK: usize = 2048;

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// One tile of the frame partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Pixel index (not byte offset) of the top-left pixel, border included.
    pub start: usize,
    pub width: usize,
    pub height: usize,
}

/// Row-major tiling of a `width x height` frame; the last column and row are
/// clipped to the remainder.
pub fn tile_blocks(
    width: usize,
    height: usize,
    pitch: usize,
    block_width: usize,
    block_height: usize,
) -> Vec<Block> {
    let xblocks = width.div_ceil(block_width);
    let yblocks = height.div_ceil(block_height);
    let xleft = width % block_width;
    let yleft = height % block_height;

    let mut blocks = Vec::with_capacity(xblocks * yblocks);
    for y in 0..yblocks {
        for x in 0..xblocks {
            blocks.push(Block {
                start: (y * block_height + BORDER) * pitch + x * block_width + BORDER,
                width: if xleft != 0 && x == xblocks - 1 {
                    xleft
                } else {
                    block_width
                },
                height: if yleft != 0 && y == yblocks - 1 {
                    yleft
                } else {
                    block_height
                },
            });
        }
    }
    blocks
}

/// Largest work buffer a frame can need: a full palette, the vector table
/// padded to 4 bytes, and a residual for every pixel.
pub fn max_work_size(
    width: usize,
    height: usize,
    format: PixelFormat,
    blocks: usize,
) -> Option<usize> {
    let pixels = width
        .checked_mul(height)?
        .checked_mul(format.bytes_per_pixel())?;
    let vectors = blocks.checked_mul(2)?.checked_add(3)? & !3;
    pixels.checked_add(vectors)?.checked_add(PALETTE_BYTES)
}

/// Validate frame dimensions.
pub fn check_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ZmbvError::InvalidDimensions { width, height });
    }
    Ok(())
}

fn alloc_zeroed(bytes: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| ZmbvError::AllocationFailure { bytes })?;
    buf.resize(bytes, 0);
    Ok(buf)
}

// ---------------------------------------------------------------------------
// FrameStore
// ---------------------------------------------------------------------------

/// Simultaneous borrows of everything one frame pass touches.
pub(crate) struct StoreParts<'a> {
    pub previous: &'a [u8],
    pub current: &'a mut [u8],
    pub work: &'a mut Vec<u8>,
    pub blocks: &'a [Block],
    pub pitch: usize,
}

/// Owns the previous/current frame buffers, the work buffer and the block
/// table for one codec instance.
pub struct FrameStore {
    width: usize,
    height: usize,
    pitch: usize,
    format: Option<PixelFormat>,
    block_width: usize,
    block_height: usize,
    buffer_size: usize,
    work_capacity: usize,
    buffers: [Vec<u8>; 2],
    /// Index into `buffers` of the buffer playing "current".
    current: usize,
    work: Vec<u8>,
    blocks: Vec<Block>,
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("block_width", &self.block_width)
            .field("block_height", &self.block_height)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

impl FrameStore {
    /// Create an unconfigured store for the given dimensions.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            pitch: width + 2 * BORDER,
            format: None,
            block_width: 0,
            block_height: 0,
            buffer_size: 0,
            work_capacity: 0,
            buffers: [Vec::new(), Vec::new()],
            current: 0,
            work: Vec::new(),
            blocks: Vec::new(),
        })
    }

    /// Change dimensions. Buffers are released; the next frame needs setup.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        check_dimensions(width, height)?;
        self.release();
        self.width = width;
        self.height = height;
        self.pitch = width + 2 * BORDER;
        Ok(())
    }

    /// Allocate zeroed buffers for `format` and build the block table.
    ///
    /// On allocation failure the store is left unconfigured.
    pub fn setup(&mut self, format: PixelFormat, block_width: usize, block_height: usize) -> Result<()> {
        if block_width == 0 || block_height == 0 {
            return Err(ZmbvError::malformed(format!(
                "zero block size {block_width}x{block_height}"
            )));
        }
        self.release();

        let bpp = format.bytes_per_pixel();
        let buffer_size = (self.height + 2 * BORDER)
            .checked_mul(self.pitch)
            .and_then(|n| n.checked_mul(bpp))
            .and_then(|n| n.checked_add(FRAME_SLACK))
            .ok_or(ZmbvError::AllocationFailure { bytes: usize::MAX })?;
        let blocks = tile_blocks(self.width, self.height, self.pitch, block_width, block_height);
        let work_capacity = max_work_size(self.width, self.height, format, blocks.len())
            .ok_or(ZmbvError::AllocationFailure { bytes: usize::MAX })?;

        let previous = alloc_zeroed(buffer_size)?;
        let current = alloc_zeroed(buffer_size)?;
        let mut work = Vec::new();
        work.try_reserve_exact(work_capacity)
            .map_err(|_| ZmbvError::AllocationFailure { bytes: work_capacity })?;

        self.blocks = blocks;
        self.buffers = [previous, current];
        self.current = 1;
        self.work = work;
        self.buffer_size = buffer_size;
        self.work_capacity = work_capacity;
        self.block_width = block_width;
        self.block_height = block_height;
        self.format = Some(format);

        debug!(
            "frame store: {}x{} {format}, {}x{} blocks ({}), {} bytes per buffer, {} work bytes",
            self.width,
            self.height,
            block_width,
            block_height,
            self.blocks.len(),
            buffer_size,
            work_capacity
        );
        Ok(())
    }

    /// Drop all buffers and return to the unconfigured state.
    pub fn release(&mut self) {
        self.buffers = [Vec::new(), Vec::new()];
        self.work = Vec::new();
        self.blocks = Vec::new();
        self.format = None;
        self.buffer_size = 0;
        self.work_capacity = 0;
        self.block_width = 0;
        self.block_height = 0;
        self.current = 0;
    }

    pub fn is_configured(&self) -> bool {
        self.format.is_some()
    }

    pub fn format(&self) -> Option<PixelFormat> {
        self.format
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row pitch in pixels.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn block_size(&self) -> (usize, usize) {
        (self.block_width, self.block_height)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Allocation size of each buffer in bytes (zero when unconfigured).
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Upper bound on the work buffer of any record for this configuration
    /// (zero when unconfigured).
    pub fn work_capacity(&self) -> usize {
        self.work_capacity
    }

    /// Bytes in one visible row.
    pub fn row_bytes(&self) -> usize {
        self.width * self.format.map_or(0, PixelFormat::bytes_per_pixel)
    }

    /// Exchange the previous and current roles.
    pub fn swap(&mut self) {
        self.current ^= 1;
    }

    /// Pin the roles so that buffer 0 is current; used when a keyframe
    /// replaces the whole picture.
    pub fn reset_roles(&mut self) {
        self.current = 0;
    }

    fn row_offset(&self, index: usize) -> usize {
        let bpp = self.format.map_or(0, PixelFormat::bytes_per_pixel);
        ((index + BORDER) * self.pitch + BORDER) * bpp
    }

    /// Visible scanline `index` of the current frame.
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        if !self.is_configured() || index >= self.height {
            return None;
        }
        let start = self.row_offset(index);
        Some(&self.buffers[self.current][start..start + self.row_bytes()])
    }

    /// Mutable visible scanline `index` of the current frame.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        if !self.is_configured() || index >= self.height {
            return None;
        }
        let start = self.row_offset(index);
        let len = self.row_bytes();
        Some(&mut self.buffers[self.current][start..start + len])
    }

    /// Visible scanline `index` of the previous frame.
    pub fn previous_row(&self, index: usize) -> Option<&[u8]> {
        if !self.is_configured() || index >= self.height {
            return None;
        }
        let start = self.row_offset(index);
        Some(&self.buffers[self.current ^ 1][start..start + self.row_bytes()])
    }

    pub(crate) fn work(&self) -> &[u8] {
        &self.work
    }

    pub(crate) fn work_mut(&mut self) -> &mut Vec<u8> {
        &mut self.work
    }

    pub(crate) fn parts(&mut self) -> StoreParts<'_> {
        let [a, b] = &mut self.buffers;
        let (previous, current) = if self.current == 0 { (b, a) } else { (a, b) };
        StoreParts {
            previous: previous.as_slice(),
            current: current.as_mut_slice(),
            work: &mut self.work,
            blocks: &self.blocks,
            pitch: self.pitch,
        }
    }

    /// Append every visible row of the current frame to the work buffer.
    pub(crate) fn append_current_rows(&mut self) {
        let row_bytes = self.row_bytes();
        for y in 0..self.height {
            let start = self.row_offset(y);
            let [a, b] = &self.buffers;
            let src = if self.current == 0 { a } else { b };
            self.work.extend_from_slice(&src[start..start + row_bytes]);
        }
    }

    /// Fill the current frame's visible rows from `data` (row-major, no
    /// border).
    pub(crate) fn load_current_rows(&mut self, data: &[u8]) {
        let layout = self.row_layout();
        fill_rows(&mut self.buffers[self.current], data, layout);
    }

    /// Fill the current frame's visible rows from the work buffer, starting
    /// at byte `offset`.
    pub(crate) fn load_current_rows_from_work(&mut self, offset: usize) {
        let layout = self.row_layout();
        fill_rows(&mut self.buffers[self.current], &self.work[offset..], layout);
    }

    fn row_layout(&self) -> RowLayout {
        RowLayout {
            first: self.row_offset(0),
            stride: self.pitch * self.format.map_or(0, PixelFormat::bytes_per_pixel),
            row_bytes: self.row_bytes(),
            rows: self.height,
        }
    }
}

#[derive(Clone, Copy)]
struct RowLayout {
    first: usize,
    stride: usize,
    row_bytes: usize,
    rows: usize,
}

fn fill_rows(buffer: &mut [u8], data: &[u8], layout: RowLayout) {
    if layout.row_bytes == 0 {
        return;
    }
    for (y, src) in data.chunks_exact(layout.row_bytes).take(layout.rows).enumerate() {
        let start = layout.first + y * layout.stride;
        buffer[start..start + layout.row_bytes].copy_from_slice(src);
    }
}
