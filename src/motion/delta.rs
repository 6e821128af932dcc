// Inter-frame block payloads.
//
// Layout after the optional palette diff in the work buffer:
//
//   [vx0 vy0 vx1 vy1 ...]   two bytes per block, row-major
//   [0..3 zero bytes]       pad to a 4-byte boundary of the work buffer
//   [xor payloads]          for each flagged block, in block order, the
//                           bytewise XOR of current and shifted previous,
//                           row by row
//
// Vector bytes are `(vx << 1) | has_payload` and `vy << 1`, two's complement.

use super::matcher::{BlockMatcher, Pixel, shifted};
use super::store::{BORDER, Block, StoreParts};
use crate::error::{Result, ZmbvError};
use crate::format::PixelFormat;

/// Start of the payload area for `blocks` vectors written at `vectors_at`.
#[inline]
fn payload_start(vectors_at: usize, blocks: usize) -> usize {
    (vectors_at + blocks * 2 + 3) & !3
}

/// One decoded vector entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockVector {
    pub vx: i32,
    pub vy: i32,
    pub has_payload: bool,
}

impl BlockVector {
    pub fn from_bytes(bx: u8, by: u8) -> Self {
        Self {
            vx: ((bx as i8) >> 1) as i32,
            vy: ((by as i8) >> 1) as i32,
            has_payload: bx & 1 != 0,
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        let bx = ((self.vx << 1) as i8 as u8) | self.has_payload as u8;
        let by = (self.vy << 1) as i8 as u8;
        [bx, by]
    }
}

/// Per-frame block counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaStats {
    pub blocks: usize,
    /// Blocks that carried an XOR payload.
    pub residual_blocks: usize,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Append the vector array and payloads for the current frame to the work
/// buffer.
pub(crate) fn encode_delta(
    matcher: &BlockMatcher,
    format: PixelFormat,
    parts: StoreParts<'_>,
) -> DeltaStats {
    match format.bytes_per_pixel() {
        1 => encode_typed::<u8>(matcher, parts),
        2 => encode_typed::<u16>(matcher, parts),
        _ => encode_typed::<u32>(matcher, parts),
    }
}

fn encode_typed<P: Pixel>(matcher: &BlockMatcher, parts: StoreParts<'_>) -> DeltaStats {
    let StoreParts {
        previous,
        current,
        work,
        blocks,
        pitch,
    } = parts;
    let current: &[u8] = current;

    let vectors_at = work.len();
    work.resize(payload_start(vectors_at, blocks.len()), 0);

    let mut stats = DeltaStats {
        blocks: blocks.len(),
        residual_blocks: 0,
    };
    for (i, block) in blocks.iter().enumerate() {
        let m = matcher.find_typed::<P>(previous, current, pitch, block);
        let v = BlockVector {
            vx: m.vx,
            vy: m.vy,
            has_payload: m.score != 0,
        };
        if v.has_payload {
            append_xor(previous, current, pitch, P::BYTES, block, v, work);
            stats.residual_blocks += 1;
        }
        work[vectors_at + 2 * i..vectors_at + 2 * i + 2].copy_from_slice(&v.to_bytes());
    }
    stats
}

fn append_xor(
    previous: &[u8],
    current: &[u8],
    pitch: usize,
    bpp: usize,
    block: &Block,
    v: BlockVector,
    work: &mut Vec<u8>,
) {
    let old_start = shifted(block.start, pitch, v.vx, v.vy);
    let len = block.width * bpp;
    for y in 0..block.height {
        let o = (old_start + y * pitch) * bpp;
        let n = (block.start + y * pitch) * bpp;
        work.extend(
            previous[o..o + len]
                .iter()
                .zip(&current[n..n + len])
                .map(|(a, b)| a ^ b),
        );
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Check the vector array at `vectors_at` and the payload length against the
/// block table, without touching any frame buffer.
pub(crate) fn validate_delta(
    work: &[u8],
    vectors_at: usize,
    blocks: &[Block],
    bpp: usize,
) -> Result<DeltaStats> {
    let vectors_end = vectors_at + blocks.len() * 2;
    if vectors_end > work.len() {
        return Err(ZmbvError::malformed(format!(
            "vector array needs {} bytes, {} available",
            blocks.len() * 2,
            work.len().saturating_sub(vectors_at)
        )));
    }

    let mut expected = payload_start(vectors_at, blocks.len());
    let mut residual_blocks = 0;
    for (block, pair) in blocks.iter().zip(work[vectors_at..vectors_end].chunks_exact(2)) {
        let v = BlockVector::from_bytes(pair[0], pair[1]);
        if v.vx.unsigned_abs() as usize > BORDER || v.vy.unsigned_abs() as usize > BORDER {
            return Err(ZmbvError::malformed(format!(
                "vector ({}, {}) exceeds the {BORDER} pixel border",
                v.vx, v.vy
            )));
        }
        if v.has_payload {
            expected += block.width * block.height * bpp;
            residual_blocks += 1;
        }
    }

    if expected != work.len() {
        return Err(ZmbvError::malformed(format!(
            "delta frame is {} bytes, blocks describe {expected}",
            work.len()
        )));
    }
    Ok(DeltaStats {
        blocks: blocks.len(),
        residual_blocks,
    })
}

/// Rebuild the current frame from the previous one and a validated work
/// buffer.
pub(crate) fn apply_delta(parts: StoreParts<'_>, vectors_at: usize, bpp: usize) {
    let StoreParts {
        previous,
        current,
        work,
        blocks,
        pitch,
    } = parts;

    let mut cursor = payload_start(vectors_at, blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        let at = vectors_at + 2 * i;
        let v = BlockVector::from_bytes(work[at], work[at + 1]);
        let old_start = shifted(block.start, pitch, v.vx, v.vy);
        let len = block.width * bpp;
        for y in 0..block.height {
            let o = (old_start + y * pitch) * bpp;
            let n = (block.start + y * pitch) * bpp;
            let src = &previous[o..o + len];
            let dst = &mut current[n..n + len];
            if v.has_payload {
                let xor = &work[cursor..cursor + len];
                for ((d, s), x) in dst.iter_mut().zip(src).zip(xor) {
                    *d = s ^ x;
                }
                cursor += len;
            } else {
                dst.copy_from_slice(src);
            }
        }
    }
}
