// Per-block motion vector search.
//
// For one block, find the vector from the VectorTable whose shifted previous
// block differs from the current block in the fewest pixels:
//
//   1. Score (0, 0) with a full compare.
//   2. Walk the remaining candidates in table order. A coarse pass (every
//      `coarse_stride`-th pixel in both axes) rejects candidates whose sampled
//      mismatch count reaches `threshold`. Survivors cost one of
//      `detailed_attempts` full compares and are adopted on strict
//      improvement only, so ties go to the earliest candidate.
//   3. Stop as soon as the best score is below `threshold`.

use super::config::SearchConfig;
use super::store::Block;
use super::vectors::VectorTable;
use crate::format::PixelFormat;

// ---------------------------------------------------------------------------
// Pixel access
// ---------------------------------------------------------------------------

/// A pixel storage width. Comparisons look at the low 24 bits of the
/// little-endian value; the top byte of a 32-bit pixel is ignored.
pub trait Pixel {
    const BYTES: usize;

    /// Comparison key of the pixel stored at `bytes[..Self::BYTES]`.
    fn key(bytes: &[u8]) -> u32;
}

impl Pixel for u8 {
    const BYTES: usize = 1;

    #[inline]
    fn key(bytes: &[u8]) -> u32 {
        bytes[0] as u32
    }
}

impl Pixel for u16 {
    const BYTES: usize = 2;

    #[inline]
    fn key(bytes: &[u8]) -> u32 {
        u16::from_le_bytes([bytes[0], bytes[1]]) as u32
    }
}

impl Pixel for u32 {
    const BYTES: usize = 4;

    #[inline]
    fn key(bytes: &[u8]) -> u32 {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) & 0x00ff_ffff
    }
}

/// Pixel index of `start` displaced by `(vx, vy)`.
///
/// Callers guarantee the vector stays within the buffer border.
#[inline]
pub(crate) fn shifted(start: usize, pitch: usize, vx: i32, vy: i32) -> usize {
    start.wrapping_add_signed(vy as isize * pitch as isize + vx as isize)
}

/// Count pixels of `block` that differ between `current` and `previous`
/// shifted by `(vx, vy)`, sampling every `stride`-th pixel in both axes.
///
/// Counting stops once `limit` is reached; the result is then `>= limit`.
pub fn mismatch<P: Pixel>(
    previous: &[u8],
    current: &[u8],
    pitch: usize,
    block: &Block,
    (vx, vy): (i32, i32),
    stride: usize,
    limit: usize,
) -> usize {
    let old_start = shifted(block.start, pitch, vx, vy);
    let mut count = 0;
    for y in (0..block.height).step_by(stride) {
        let old_row = (old_start + y * pitch) * P::BYTES;
        let new_row = (block.start + y * pitch) * P::BYTES;
        for x in (0..block.width).step_by(stride) {
            let o = old_row + x * P::BYTES;
            let n = new_row + x * P::BYTES;
            if P::key(&previous[o..o + P::BYTES]) != P::key(&current[n..n + P::BYTES]) {
                count += 1;
                if count >= limit {
                    return count;
                }
            }
        }
    }
    count
}

// ---------------------------------------------------------------------------
// BlockMatcher
// ---------------------------------------------------------------------------

/// Outcome of the search for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMatch {
    pub vx: i32,
    pub vy: i32,
    /// Differing pixels at the chosen vector; zero means a pure copy.
    pub score: usize,
}

/// Vector search over a fixed candidate table.
#[derive(Debug, Clone)]
pub struct BlockMatcher {
    table: VectorTable,
    config: SearchConfig,
}

impl BlockMatcher {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            table: VectorTable::new(),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn table(&self) -> &VectorTable {
        &self.table
    }

    /// Search with the pixel width of `format`.
    pub fn find(
        &self,
        format: PixelFormat,
        previous: &[u8],
        current: &[u8],
        pitch: usize,
        block: &Block,
    ) -> BlockMatch {
        match format.bytes_per_pixel() {
            1 => self.find_typed::<u8>(previous, current, pitch, block),
            2 => self.find_typed::<u16>(previous, current, pitch, block),
            _ => self.find_typed::<u32>(previous, current, pitch, block),
        }
    }

    pub fn find_typed<P: Pixel>(
        &self,
        previous: &[u8],
        current: &[u8],
        pitch: usize,
        block: &Block,
    ) -> BlockMatch {
        let cfg = &self.config;
        let mut best = BlockMatch {
            vx: 0,
            vy: 0,
            score: mismatch::<P>(previous, current, pitch, block, (0, 0), 1, usize::MAX),
        };
        let mut attempts = cfg.detailed_attempts;

        for &(vx, vy) in self.table.candidates() {
            if best.score < cfg.threshold || attempts == 0 {
                break;
            }
            let coarse = mismatch::<P>(
                previous,
                current,
                pitch,
                block,
                (vx, vy),
                cfg.coarse_stride,
                cfg.threshold,
            );
            if coarse >= cfg.threshold {
                continue;
            }
            attempts -= 1;
            let score = mismatch::<P>(previous, current, pitch, block, (vx, vy), 1, best.score);
            if score < best.score {
                best = BlockMatch { vx, vy, score };
            }
        }
        best
    }
}

impl Default for BlockMatcher {
    fn default() -> Self {
        Self::new(SearchConfig::REFERENCE)
    }
}
