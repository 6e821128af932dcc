//! ZMBV (Zip Motion Block Video): a lossless screen-capture codec.
//!
//! Frames are split into blocks; each block of a delta frame is sent as a
//! motion vector into the previous frame plus an optional XOR residual, and
//! the whole payload runs through one zlib stream per keyframe interval.
//!
//! The crate provides:
//! - Wire-level types: pixel formats, palette, headers (`format`)
//! - Motion search and block delta coding (`motion`)
//! - Frame encoder/decoder and the zlib stage (`codec`)
//! - 24-bit RGB/BGR conversion of decoded frames (`export`)
//! - Length-prefixed record streams and file helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use zmbv::{EncodeOptions, FrameDecoder, FrameEncoder, PixelFormat};
//!
//! let (w, h) = (32, 16);
//! let first = vec![0x11u8; w * h * 2];
//! let mut second = first.clone();
//! second[100] = 0x42;
//!
//! let mut enc = FrameEncoder::new(w, h, EncodeOptions::default()).unwrap();
//! let mut dec = FrameDecoder::new(w, h).unwrap();
//! for frame in [&first, &second] {
//!     let mut record = Vec::new();
//!     enc.encode_frame(PixelFormat::Bpp16, None, frame, false, &mut record).unwrap();
//!     dec.decode_frame(&record).unwrap();
//!     let decoded: Vec<u8> = dec.lines().flatten().copied().collect();
//!     assert_eq!(&decoded, frame);
//! }
//! ```

pub mod codec;
pub mod error;
pub mod export;
pub mod format;
pub mod io;
pub mod motion;

#[cfg(feature = "cli")]
pub mod cli;

pub use codec::{EncodeOptions, FrameDecoder, FrameEncoder, FrameInfo};
pub use error::{Result, ZmbvError};
pub use export::{ChannelOrder, ExportOptions, Orientation};
pub use format::{CompressionMode, Palette, PixelFormat, max_frame_size};
pub use motion::SearchConfig;
