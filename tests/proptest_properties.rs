use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zmbv::motion::{BORDER, BlockMatcher, SearchConfig, mismatch, tile_blocks};
use zmbv::{CompressionMode, EncodeOptions, FrameDecoder, FrameEncoder, Palette, PixelFormat};

/// Frames that mix copies of the previous frame (shifted by a small random
/// offset) with random edits, so both vectors and residuals get exercised.
fn frame_sequence(width: usize, height: usize, format: PixelFormat, count: usize, seed: u64) -> Vec<Vec<u8>> {
    let bpp = format.bytes_per_pixel();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut frames: Vec<Vec<u8>> = Vec::with_capacity(count);
    let mut first = vec![0u8; width * height * bpp];
    rng.fill(&mut first[..]);
    frames.push(first);

    for _ in 1..count {
        let prev = frames.last().unwrap();
        let dx = rng.random_range(-3i32..=3);
        let dy = rng.random_range(-3i32..=3);
        let mut next = vec![0u8; prev.len()];
        for y in 0..height {
            for x in 0..width {
                let sx = (x as i32 + dx).clamp(0, width as i32 - 1) as usize;
                let sy = (y as i32 + dy).clamp(0, height as i32 - 1) as usize;
                let d = (y * width + x) * bpp;
                let s = (sy * width + sx) * bpp;
                next[d..d + bpp].copy_from_slice(&prev[s..s + bpp]);
            }
        }
        for _ in 0..rng.random_range(0..8) {
            let i = rng.random_range(0..next.len());
            next[i] = rng.random();
        }
        frames.push(next);
    }
    if bpp == 4 {
        // Alpha does not take part in block matching.
        for f in &mut frames {
            for px in f.chunks_exact_mut(4) {
                px[3] = 0;
            }
        }
    }
    frames
}

proptest! {
    #[test]
    fn prop_encode_decode_roundtrip(
        width in 1usize..48,
        height in 1usize..40,
        format_index in 0usize..4,
        block in 1u8..=24,
        stored in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let format = PixelFormat::ALL[format_index];
        let options = EncodeOptions {
            compression: if stored { CompressionMode::None } else { CompressionMode::Zlib },
            block_width: block,
            block_height: block.div_ceil(2),
            ..EncodeOptions::default()
        };
        let mut enc = FrameEncoder::new(width, height, options).unwrap();
        let mut dec = FrameDecoder::new(width, height).unwrap();
        let mut record = Vec::new();
        for (n, frame) in frame_sequence(width, height, format, 5, seed).iter().enumerate() {
            record.clear();
            let info = enc.encode_frame(format, None, frame, false, &mut record).unwrap();
            prop_assert_eq!(info.is_keyframe(), n == 0);
            dec.decode_frame(&record).unwrap();
            let decoded: Vec<u8> = dec.lines().flatten().copied().collect();
            prop_assert_eq!(&decoded, frame);
        }
    }

    #[test]
    fn prop_palette_follows_encoder(
        entries in proptest::collection::vec((any::<u8>(), any::<[u8; 3]>()), 0..16),
        seed in any::<u64>(),
    ) {
        let frames = frame_sequence(12, 12, PixelFormat::Bpp8, entries.len() + 1, seed);
        let mut enc = FrameEncoder::new(12, 12, EncodeOptions::default()).unwrap();
        let mut dec = FrameDecoder::new(12, 12).unwrap();
        let mut palette = Palette::default();
        let mut record = Vec::new();
        for (n, frame) in frames.iter().enumerate() {
            if let Some(&(index, rgb)) = entries.get(n.wrapping_sub(1)) {
                palette.set_entry(index, rgb);
            }
            record.clear();
            enc.encode_frame(PixelFormat::Bpp8, Some(&palette), frame, false, &mut record).unwrap();
            dec.decode_frame(&record).unwrap();
            prop_assert_eq!(dec.palette(), &palette);
        }
    }

    #[test]
    fn prop_decoder_survives_arbitrary_records(
        tail in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..600), 1..6),
        seed in any::<u64>(),
    ) {
        let frames = frame_sequence(16, 8, PixelFormat::Bpp16, 1, seed);
        let mut enc = FrameEncoder::new(16, 8, EncodeOptions::default()).unwrap();
        let mut key = Vec::new();
        enc.encode_frame(PixelFormat::Bpp16, None, &frames[0], false, &mut key).unwrap();

        let mut dec = FrameDecoder::new(16, 8).unwrap();
        dec.decode_frame(&key).unwrap();
        for record in &tail {
            let before: Vec<u8> = dec.lines().flatten().copied().collect();
            if dec.decode_frame(record).is_err() {
                // A rejected record leaves the frame as it was, unless it
                // was a keyframe that reconfigured the decoder.
                let after: Vec<u8> = dec.lines().flatten().copied().collect();
                if dec.format() == Some(PixelFormat::Bpp16) && after.len() == before.len() {
                    prop_assert!(after == before || record.first().is_some_and(|t| t & 1 == 1));
                }
            }
        }
        // A keyframe always recovers.
        dec.decode_frame(&key).unwrap();
        let decoded: Vec<u8> = dec.lines().flatten().copied().collect();
        prop_assert_eq!(decoded, frames[0].clone());
    }

    #[test]
    fn prop_match_score_is_exact_mismatch(
        seed in any::<u64>(),
        exhaustive in any::<bool>(),
    ) {
        // Unrelated random 24x24 frames tiled into 8x8 blocks.
        let (w, h) = (24usize, 24usize);
        let pitch = w + 2 * BORDER;
        let size = (h + 2 * BORDER) * pitch;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut previous = vec![0u8; size];
        let mut current = vec![0u8; size];
        for y in 0..h {
            for x in 0..w {
                let i = (y + BORDER) * pitch + x + BORDER;
                previous[i] = rng.random_range(0..4);
                current[i] = rng.random_range(0..4);
            }
        }
        let blocks = tile_blocks(w, h, pitch, 8, 8);
        let matcher = BlockMatcher::new(if exhaustive { SearchConfig::EXHAUSTIVE } else { SearchConfig::REFERENCE });
        for block in &blocks {
            let m = matcher.find(PixelFormat::Bpp8, &previous, &current, pitch, block);
            let full = mismatch::<u8>(&previous, &current, pitch, block, (m.vx, m.vy), 1, usize::MAX);
            prop_assert_eq!(m.score, full);
            let origin = mismatch::<u8>(&previous, &current, pitch, block, (0, 0), 1, usize::MAX);
            prop_assert!(m.score <= origin);
            prop_assert!(m.vx.abs() <= 10 && m.vy.abs() <= 10);
        }
    }
}
