// Entropy stage between the work buffer and the wire.
//
// One zlib stream spans every frame from a keyframe up to (not including) the
// next keyframe. Each frame is flushed with Z_SYNC_FLUSH so a record can be
// decoded as soon as it arrives, and the stream is reset exactly on keyframes
// in both directions.
//
// Implementations:
//   - DeflateStage: zlib-wrapped deflate (encoder side)
//   - InflateStage: zlib-wrapped inflate (decoder side)
//   - StoredStage:  compression mode 0, bytes pass through unchanged

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use log::debug;

use crate::error::{Result, ZmbvError};
use crate::format::CompressionMode;

/// Default deflate level of the reference encoder.
pub const DEFAULT_LEVEL: u32 = 4;

/// Output growth step while a stream is being drained.
const CHUNK: usize = 32 * 1024;

// ---------------------------------------------------------------------------
// EntropyStage trait
// ---------------------------------------------------------------------------

/// A per-frame byte transform with stream state carried between frames.
pub trait EntropyStage: Send {
    /// Compression mode written to (or read from) keyframe headers.
    fn compression(&self) -> CompressionMode;

    /// Start a fresh stream. Called on every keyframe.
    fn reset(&mut self);

    /// Append the transform of `input` to `output`.
    ///
    /// Fails when `output` would grow past `limit` bytes.
    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>, limit: usize) -> Result<()>;
}

/// Build the encoder-side stage for a compression mode.
pub fn encoder_stage(mode: CompressionMode, level: u32) -> Box<dyn EntropyStage> {
    match mode {
        CompressionMode::None => Box::new(StoredStage),
        CompressionMode::Zlib => Box::new(DeflateStage::new(level)),
    }
}

/// Build the decoder-side stage for a compression mode.
pub fn decoder_stage(mode: CompressionMode) -> Box<dyn EntropyStage> {
    match mode {
        CompressionMode::None => Box::new(StoredStage),
        CompressionMode::Zlib => Box::new(InflateStage::new()),
    }
}

// ---------------------------------------------------------------------------
// Deflate
// ---------------------------------------------------------------------------

/// Persistent zlib compressor.
pub struct DeflateStage {
    level: u32,
    stream: Compress,
}

impl DeflateStage {
    /// Create a stage at `level` (clamped to 0-9).
    pub fn new(level: u32) -> Self {
        let level = level.min(9);
        Self {
            level,
            stream: Compress::new(Compression::new(level), true),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for DeflateStage {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl std::fmt::Debug for DeflateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateStage")
            .field("level", &self.level)
            .field("total_in", &self.stream.total_in())
            .field("total_out", &self.stream.total_out())
            .finish()
    }
}

impl EntropyStage for DeflateStage {
    fn compression(&self) -> CompressionMode {
        CompressionMode::Zlib
    }

    fn reset(&mut self) {
        debug!("deflate stream reset (level {})", self.level);
        self.stream.reset();
    }

    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>, limit: usize) -> Result<()> {
        let start_in = self.stream.total_in();
        output.reserve(input.len() + input.len() / 1000 + 64);

        loop {
            let before_in = self.stream.total_in();
            let before_out = self.stream.total_out();
            let consumed = (before_in - start_in) as usize;

            self.stream
                .compress_vec(&input[consumed..], output, FlushCompress::Sync)?;

            if output.len() > limit {
                return Err(ZmbvError::CompressionFailure(format!(
                    "deflate output exceeds {limit} bytes"
                )));
            }
            let all_in = (self.stream.total_in() - start_in) as usize == input.len();
            // Spare room after a sync flush means nothing is pending.
            if all_in && output.len() < output.capacity() {
                return Ok(());
            }
            if self.stream.total_in() == before_in
                && self.stream.total_out() == before_out
                && output.len() < output.capacity()
            {
                return Err(ZmbvError::CompressionFailure(format!(
                    "deflate stalled after {consumed} of {} bytes",
                    input.len()
                )));
            }
            if output.len() == output.capacity() {
                output.reserve(CHUNK);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inflate
// ---------------------------------------------------------------------------

/// Persistent zlib decompressor.
pub struct InflateStage {
    stream: Decompress,
}

impl InflateStage {
    pub fn new() -> Self {
        Self {
            stream: Decompress::new(true),
        }
    }
}

impl Default for InflateStage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InflateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflateStage")
            .field("total_in", &self.stream.total_in())
            .field("total_out", &self.stream.total_out())
            .finish()
    }
}

impl EntropyStage for InflateStage {
    fn compression(&self) -> CompressionMode {
        CompressionMode::Zlib
    }

    fn reset(&mut self) {
        debug!("inflate stream reset");
        self.stream.reset(true);
    }

    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>, limit: usize) -> Result<()> {
        let start_in = self.stream.total_in();

        loop {
            if output.len() == output.capacity() {
                // One byte past the limit so an exact fit can still be told
                // apart from an overflow.
                let room = (limit + 1).saturating_sub(output.len());
                if room == 0 {
                    return Err(ZmbvError::malformed(format!(
                        "payload inflates past {limit} bytes"
                    )));
                }
                output.reserve(room.min(CHUNK));
            }

            let before_in = self.stream.total_in();
            let before_len = output.len();
            let consumed = (before_in - start_in) as usize;

            let status =
                self.stream
                    .decompress_vec(&input[consumed..], output, FlushDecompress::Sync)?;

            if output.len() > limit {
                return Err(ZmbvError::malformed(format!(
                    "payload inflates past {limit} bytes"
                )));
            }
            let all_in = (self.stream.total_in() - start_in) as usize == input.len();
            if status == Status::StreamEnd || (all_in && output.len() < output.capacity()) {
                return Ok(());
            }
            if self.stream.total_in() == before_in && output.len() == before_len {
                if all_in {
                    return Ok(());
                }
                if output.len() < output.capacity() {
                    return Err(ZmbvError::CompressionFailure(format!(
                        "inflate stalled after {consumed} of {} bytes",
                        input.len()
                    )));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stored
// ---------------------------------------------------------------------------

/// Compression mode 0: the work buffer goes on the wire as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredStage;

impl EntropyStage for StoredStage {
    fn compression(&self) -> CompressionMode {
        CompressionMode::None
    }

    fn reset(&mut self) {}

    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>, limit: usize) -> Result<()> {
        if output.len() + input.len() > limit {
            return Err(ZmbvError::malformed(format!(
                "stored payload of {} bytes exceeds {limit}",
                input.len()
            )));
        }
        output.extend_from_slice(input);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize, seed: u8) -> Vec<u8> {
        (0..n).map(|i| ((i / 7) as u8).wrapping_mul(seed)).collect()
    }

    #[test]
    fn sync_flushed_frames_decode_one_by_one() {
        let mut deflate = DeflateStage::default();
        let mut inflate = InflateStage::new();
        for (i, frame) in [sample(5000, 3), sample(100, 5), Vec::new(), sample(70_000, 11)]
            .iter()
            .enumerate()
        {
            let mut wire = Vec::new();
            deflate.transform(frame, &mut wire, usize::MAX).unwrap();
            let mut out = Vec::new();
            inflate.transform(&wire, &mut out, frame.len()).unwrap();
            assert_eq!(&out, frame, "frame {i}");
        }
    }

    #[test]
    fn reset_restarts_both_streams() {
        let mut deflate = DeflateStage::new(9);
        let mut inflate = InflateStage::new();
        let data = sample(2000, 7);

        let mut first = Vec::new();
        deflate.transform(&data, &mut first, usize::MAX).unwrap();
        let mut later = Vec::new();
        deflate.transform(&data, &mut later, usize::MAX).unwrap();
        // Repeated data compresses against the history.
        assert!(later.len() < first.len());

        deflate.reset();
        let mut again = Vec::new();
        deflate.transform(&data, &mut again, usize::MAX).unwrap();
        assert_eq!(again, first);

        let mut out = Vec::new();
        inflate.transform(&first, &mut out, data.len()).unwrap();
        inflate.reset();
        out.clear();
        inflate.transform(&again, &mut out, data.len()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn inflate_limit_enforced() {
        let mut deflate = DeflateStage::default();
        let data = sample(4096, 13);
        let mut wire = Vec::new();
        deflate.transform(&data, &mut wire, usize::MAX).unwrap();

        let mut out = Vec::new();
        let err = InflateStage::new()
            .transform(&wire, &mut out, 4095)
            .unwrap_err();
        assert!(matches!(err, ZmbvError::MalformedFrame(_)));

        let mut out = Vec::new();
        InflateStage::new().transform(&wire, &mut out, 4096).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn garbage_is_a_stream_failure() {
        let mut out = Vec::new();
        let err = InflateStage::new()
            .transform(&[0xde, 0xad, 0xbe, 0xef, 0x00], &mut out, 1024)
            .unwrap_err();
        assert!(matches!(err, ZmbvError::CompressionFailure(_)));
    }

    #[test]
    fn stored_passes_through() {
        let mut stage = StoredStage;
        assert_eq!(stage.compression(), CompressionMode::None);
        let mut out = vec![1];
        stage.transform(&[2, 3], &mut out, 3).unwrap();
        assert_eq!(out, [1, 2, 3]);
        assert!(stage.transform(&[4], &mut out, 3).is_err());
    }

    #[test]
    fn stage_factories() {
        assert_eq!(encoder_stage(CompressionMode::Zlib, 4).compression(), CompressionMode::Zlib);
        assert_eq!(decoder_stage(CompressionMode::None).compression(), CompressionMode::None);
        assert_eq!(DeflateStage::new(42).level(), 9);
    }
}
