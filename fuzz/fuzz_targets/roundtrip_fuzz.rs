#![no_main]
use libfuzzer_sys::fuzz_target;
use zmbv::{CompressionMode, EncodeOptions, FrameDecoder, FrameEncoder, PixelFormat};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    // Header bytes: format, width, height, block size / compression.
    let format = PixelFormat::ALL[data[0] as usize % 4];
    let width = 1 + data[1] as usize % 40;
    let height = 1 + data[2] as usize % 40;
    let options = EncodeOptions {
        compression: if data[3] & 0x80 != 0 {
            CompressionMode::None
        } else {
            CompressionMode::Zlib
        },
        block_width: 1 + (data[3] & 0x1f),
        block_height: 1 + ((data[3] >> 2) & 0x1f),
        ..EncodeOptions::default()
    };
    let payload = &data[4..];
    let frame_len = width * height * format.bytes_per_pixel();
    if payload.is_empty() {
        return;
    }

    let mut enc = FrameEncoder::new(width, height, options).unwrap();
    let mut dec = FrameDecoder::new(width, height).unwrap();
    let mut record = Vec::new();

    // Frames are taken cyclically from the payload at shifting offsets so
    // consecutive frames overlap.
    for n in 0..4 {
        let mut frame: Vec<u8> = (0..frame_len)
            .map(|i| payload[(i + n * 7) % payload.len()])
            .collect();
        if format == PixelFormat::Bpp32 {
            for px in frame.chunks_exact_mut(4) {
                px[3] = 0;
            }
        }
        record.clear();
        enc.encode_frame(format, None, &frame, false, &mut record).unwrap();
        dec.decode_frame(&record).unwrap();
        let decoded: Vec<u8> = dec.lines().flatten().copied().collect();
        assert_eq!(decoded, frame);
    }
});
