#![no_main]
use libfuzzer_sys::fuzz_target;
use zmbv::FrameDecoder;

fuzz_target!(|data: &[u8]| {
    // First two bytes pick the frame size; the rest is a sequence of records,
    // each preceded by a little-endian u16 length. The decoder must never
    // panic, only return errors.
    if data.len() < 2 {
        return;
    }
    let width = 1 + data[0] as usize % 64;
    let height = 1 + data[1] as usize % 64;
    let Ok(mut dec) = FrameDecoder::new(width, height) else {
        return;
    };

    let mut rest = &data[2..];
    while rest.len() >= 2 {
        let len = (u16::from_le_bytes([rest[0], rest[1]]) as usize).min(rest.len() - 2);
        let _ = dec.decode_frame(&rest[2..2 + len]);
        rest = &rest[2 + len..];
    }

    let row = width * dec.format().map_or(0, |f| f.bytes_per_pixel());
    for line in dec.lines() {
        assert_eq!(line.len(), row);
    }
});
