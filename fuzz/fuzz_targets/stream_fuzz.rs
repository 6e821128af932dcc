#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use zmbv::ExportOptions;
use zmbv::io::{OutputLayout, decode_stream};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a record stream; errors are fine, panics are not.
    let _ = decode_stream(Cursor::new(data), std::io::sink(), 16, 12, OutputLayout::Raw);
    let _ = decode_stream(
        Cursor::new(data),
        std::io::sink(),
        7,
        5,
        OutputLayout::Rgb24(ExportOptions::dib()),
    );
});
