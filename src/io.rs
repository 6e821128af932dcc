// Record streams and file-level helpers.
//
// A record stream stores one wire record per frame:
//
//   u32 frame count | u32 keyframe index entries | u32 index offset
//   { u32 size | size bytes of record } * frame count
//   u32 * entries   offsets of the keyframes' size fields from the stream start
//
// Offsets count from the first header byte, so a stream appended after other
// data in a file stays self-contained.
//
// All integers are little-endian. The header is patched when the writer is
// finished, so the output must be seekable.
//
// Raw frame files (encoder input, `raw` decoder output) hold frames back to
// back: the 768-byte RGB palette for 8bpp frames, then `height` rows of
// `width * pixel_size` bytes. SHA-256 checksums of the raw side are computed
// when the `file-io` feature is enabled.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;
#[cfg(feature = "file-io")]
use sha2::Digest;
use thiserror::Error;

use crate::codec::{EncodeOptions, FrameDecoder, FrameEncoder};
use crate::error::ZmbvError;
use crate::export::{self, ExportOptions};
use crate::format::{PALETTE_BYTES, Palette, PixelFormat};

/// Size of the record stream header.
pub const STREAM_HEADER_LEN: u64 = 12;

/// Keyframe spacing used when none is given.
pub const DEFAULT_KEYFRAME_INTERVAL: u32 = 300;

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for record streams and file helpers.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] ZmbvError),
    #[error("truncated stream: {0}")]
    Truncated(String),
}

fn too_large(what: &str) -> StreamError {
    StreamError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{what} does not fit a 32-bit stream field"),
    ))
}

fn read_u32<R: Read>(reader: &mut R, what: &str) -> Result<u32, StreamError> {
    let mut b = [0u8; 4];
    reader.read_exact(&mut b).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => StreamError::Truncated(format!("missing {what}")),
        _ => StreamError::Io(e),
    })?;
    Ok(u32::from_le_bytes(b))
}

// ---------------------------------------------------------------------------
// StreamWriter
// ---------------------------------------------------------------------------

/// Writes length-prefixed records and the keyframe index.
#[derive(Debug)]
pub struct StreamWriter<W: Write + Seek> {
    inner: W,
    base: u64,
    position: u64,
    frames: u32,
    index: Vec<u32>,
}

impl<W: Write + Seek> StreamWriter<W> {
    /// Reserve the header at the current position of `inner`.
    pub fn new(mut inner: W) -> Result<Self, StreamError> {
        let base = inner.stream_position()?;
        inner.write_all(&[0u8; STREAM_HEADER_LEN as usize])?;
        Ok(Self {
            inner,
            base,
            position: STREAM_HEADER_LEN,
            frames: 0,
            index: Vec::new(),
        })
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn keyframes(&self) -> usize {
        self.index.len()
    }

    /// Bytes written so far, header included.
    pub fn bytes_written(&self) -> u64 {
        self.position
    }

    /// Append one record.
    pub fn write_record(&mut self, record: &[u8], keyframe: bool) -> Result<(), StreamError> {
        let size = u32::try_from(record.len()).map_err(|_| too_large("record size"))?;
        if keyframe {
            let offset = u32::try_from(self.position).map_err(|_| too_large("record offset"))?;
            self.index.push(offset);
        }
        self.inner.write_all(&size.to_le_bytes())?;
        self.inner.write_all(record)?;
        self.position += 4 + record.len() as u64;
        self.frames += 1;
        Ok(())
    }

    /// Write the keyframe index, patch the header and return the writer.
    pub fn finish(mut self) -> Result<W, StreamError> {
        let index_offset =
            u32::try_from(self.position).map_err(|_| too_large("index offset"))?;
        for offset in &self.index {
            self.inner.write_all(&offset.to_le_bytes())?;
        }
        let end = self.inner.stream_position()?;

        self.inner.seek(SeekFrom::Start(self.base))?;
        self.inner.write_all(&self.frames.to_le_bytes())?;
        self.inner.write_all(&(self.index.len() as u32).to_le_bytes())?;
        self.inner.write_all(&index_offset.to_le_bytes())?;
        self.inner.seek(SeekFrom::Start(end))?;
        self.inner.flush()?;
        debug!(
            "record stream finished: {} frames, {} keyframes",
            self.frames,
            self.index.len()
        );
        Ok(self.inner)
    }
}

// ---------------------------------------------------------------------------
// StreamReader
// ---------------------------------------------------------------------------

/// Reads records back in order.
#[derive(Debug)]
pub struct StreamReader<R: Read> {
    inner: R,
    frames: u32,
    index_len: u32,
    index_offset: u32,
    read: u32,
    /// Bytes consumed since the first header byte.
    consumed: u64,
}

impl<R: Read> StreamReader<R> {
    /// Read the stream header.
    pub fn new(mut inner: R) -> Result<Self, StreamError> {
        let frames = read_u32(&mut inner, "frame count")?;
        let index_len = read_u32(&mut inner, "keyframe index length")?;
        let index_offset = read_u32(&mut inner, "keyframe index offset")?;
        Ok(Self {
            inner,
            frames,
            index_len,
            index_offset,
            read: 0,
            consumed: STREAM_HEADER_LEN,
        })
    }

    /// Frame count from the header.
    pub fn frame_count(&self) -> u32 {
        self.frames
    }

    pub fn index_len(&self) -> u32 {
        self.index_len
    }

    pub fn index_offset(&self) -> u32 {
        self.index_offset
    }

    /// Read the next record into `buf`. Returns `None` after the last frame.
    pub fn next_record(&mut self, buf: &mut Vec<u8>) -> Result<Option<usize>, StreamError> {
        if self.read >= self.frames {
            return Ok(None);
        }
        let frame = self.read;
        let size = read_u32(&mut self.inner, "record size")? as usize;
        buf.clear();
        // `take` grows the buffer with the data instead of trusting `size`.
        (&mut self.inner).take(size as u64).read_to_end(buf)?;
        if buf.len() != size {
            return Err(StreamError::Truncated(format!(
                "record {frame} has {} of {size} bytes",
                buf.len()
            )));
        }
        self.read += 1;
        self.consumed += 4 + size as u64;
        Ok(Some(size))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> StreamReader<R> {
    /// Load the keyframe index without disturbing sequential reading.
    ///
    /// Entries are offsets from the start of the stream header, which need
    /// not be the start of the underlying file.
    pub fn keyframe_index(&mut self) -> Result<Vec<u32>, StreamError> {
        let resume = self.inner.stream_position()?;
        let base = resume.checked_sub(self.consumed).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "reader position precedes the stream header")
        })?;
        self.inner.seek(SeekFrom::Start(base + self.index_offset as u64))?;
        let mut index = Vec::new();
        for _ in 0..self.index_len {
            index.push(read_u32(&mut self.inner, "keyframe index entry")?);
        }
        self.inner.seek(SeekFrom::Start(resume))?;
        Ok(index)
    }
}

// ---------------------------------------------------------------------------
// Raw frames
// ---------------------------------------------------------------------------

/// Bytes of one raw frame: palette (8bpp only) plus pixel rows.
pub fn raw_frame_size(width: usize, height: usize, format: PixelFormat) -> usize {
    let palette = if format.is_palettized() {
        PALETTE_BYTES
    } else {
        0
    };
    palette + width * height * format.bytes_per_pixel()
}

/// Fill `buf` from `reader`. `Ok(false)` on a clean end of input.
fn read_frame<R: Read>(reader: &mut R, buf: &mut [u8], frame: u64) -> Result<bool, StreamError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(false),
        n if n == buf.len() => Ok(true),
        n => Err(StreamError::Truncated(format!(
            "raw frame {frame} has {n} of {} bytes",
            buf.len()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_stream()` / `encode_file()`.
#[derive(Debug, Clone, Default)]
pub struct EncodeStats {
    pub frames: u64,
    pub keyframes: u64,
    /// Raw input consumed in bytes.
    pub input_size: u64,
    /// Record stream size in bytes.
    pub output_size: u64,
    /// SHA-256 of the raw input (if `file-io` feature is enabled).
    pub input_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `decode_stream()` / `decode_file()`.
#[derive(Debug, Clone, Default)]
pub struct DecodeStats {
    pub frames: u64,
    pub keyframes: u64,
    /// Record stream size in bytes.
    pub input_size: u64,
    /// Decoded output size in bytes.
    pub output_size: u64,
    /// SHA-256 of the decoded output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Parameters of a raw-frames -> record-stream run.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    /// Every n-th frame is a keyframe; 0 means only the first.
    pub keyframe_interval: u32,
    pub options: EncodeOptions,
}

impl EncodeJob {
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
            options: EncodeOptions::default(),
        }
    }

    fn is_scheduled_keyframe(&self, frame: u64) -> bool {
        match self.keyframe_interval {
            0 => frame == 0,
            n => frame % n as u64 == 0,
        }
    }
}

/// Encode raw frames from `input` into a record stream on `output`.
pub fn encode_stream<R: Read, W: Write + Seek>(
    mut input: R,
    output: W,
    job: &EncodeJob,
) -> Result<(W, EncodeStats), StreamError> {
    let mut encoder = FrameEncoder::new(job.width, job.height, job.options)?;
    let mut writer = StreamWriter::new(output)?;
    let palette_len = if job.format.is_palettized() {
        PALETTE_BYTES
    } else {
        0
    };

    let mut frame = vec![0u8; raw_frame_size(job.width, job.height, job.format)];
    let mut record = Vec::new();
    let mut stats = EncodeStats::default();
    #[cfg(feature = "file-io")]
    let mut hasher = sha2::Sha256::new();

    while read_frame(&mut input, &mut frame, stats.frames)? {
        #[cfg(feature = "file-io")]
        hasher.update(&frame);

        let palette = (palette_len > 0).then(|| Palette::from_rgb(&frame[..palette_len]));
        record.clear();
        let info = encoder.encode_frame(
            job.format,
            palette.as_ref(),
            &frame[palette_len..],
            job.is_scheduled_keyframe(stats.frames),
            &mut record,
        )?;
        writer.write_record(&record, info.is_keyframe())?;

        stats.frames += 1;
        stats.keyframes += info.is_keyframe() as u64;
        stats.input_size += frame.len() as u64;
    }

    stats.output_size = writer.bytes_written() + 4 * writer.keyframes() as u64;
    #[cfg(feature = "file-io")]
    {
        stats.input_sha256 = Some(hasher.finalize().into());
    }
    let output = writer.finish()?;
    Ok((output, stats))
}

/// Encode a raw frame file into a record stream file.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    job: &EncodeJob,
) -> Result<EncodeStats, StreamError> {
    let input = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let output = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);
    let (mut output, stats) = encode_stream(input, output, job)?;
    output.flush()?;
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// How decoded frames are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// Same layout as raw encoder input.
    Raw,
    /// Packed 24-bit color.
    Rgb24(ExportOptions),
}

/// Decode a record stream from `input`, writing frames to `output`.
pub fn decode_stream<R: Read, W: Write>(
    input: R,
    output: W,
    width: usize,
    height: usize,
    layout: OutputLayout,
) -> Result<DecodeStats, StreamError> {
    let mut reader = StreamReader::new(input)?;
    let mut decoder = FrameDecoder::new(width, height)?;
    let mut stats = DecodeStats {
        input_size: STREAM_HEADER_LEN,
        ..DecodeStats::default()
    };

    #[cfg(feature = "file-io")]
    let mut hasher = sha2::Sha256::new();
    #[cfg(feature = "file-io")]
    let mut output = HashingWriter {
        inner: output,
        hasher: &mut hasher,
    };
    #[cfg(not(feature = "file-io"))]
    let mut output = output;

    let mut record = Vec::new();
    let mut frame = Vec::new();
    while let Some(size) = reader.next_record(&mut record)? {
        let info = decoder.decode_frame(&record)?;
        stats.frames += 1;
        stats.keyframes += info.is_keyframe() as u64;
        stats.input_size += 4 + size as u64;

        frame.clear();
        match layout {
            OutputLayout::Raw => {
                if info.format.is_palettized() {
                    frame.extend_from_slice(decoder.palette().as_bytes());
                }
                for line in decoder.lines() {
                    frame.extend_from_slice(line);
                }
            }
            OutputLayout::Rgb24(options) => {
                export::export_frame(&decoder, &options, &mut frame)?;
            }
        }
        output.write_all(&frame)?;
        stats.output_size += frame.len() as u64;
    }
    output.flush()?;

    stats.input_size += 4 * reader.index_len() as u64;
    #[cfg(feature = "file-io")]
    {
        drop(output);
        stats.output_sha256 = Some(hasher.finalize().into());
    }
    Ok(stats)
}

/// Decode a record stream file.
pub fn decode_file(
    input_path: &Path,
    output_path: &Path,
    width: usize,
    height: usize,
    layout: OutputLayout,
) -> Result<DecodeStats, StreamError> {
    let input = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let output = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);
    decode_stream(input, output, width, height, layout)
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn raw_frames(width: usize, height: usize, count: usize) -> Vec<u8> {
        let mut raw = Vec::new();
        for f in 0..count {
            let mut pal = Palette::default();
            pal.set_entry(1, [f as u8, 2, 3]);
            raw.extend_from_slice(pal.as_bytes());
            for y in 0..height {
                for x in 0..width {
                    raw.push(((x + y + f) % 7) as u8);
                }
            }
        }
        raw
    }

    #[test]
    fn writer_layout_and_index() {
        let mut w = StreamWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write_record(&[1, 2, 3], true).unwrap();
        w.write_record(&[4], false).unwrap();
        w.write_record(&[5, 6], true).unwrap();
        let bytes = w.finish().unwrap().into_inner();

        let u32_at = |i: usize| u32::from_le_bytes(bytes[i..i + 4].try_into().unwrap());
        assert_eq!(u32_at(0), 3);
        assert_eq!(u32_at(4), 2);
        let index_offset = u32_at(8) as usize;
        assert_eq!(index_offset, 12 + 7 + 5 + 6);
        assert_eq!(u32_at(index_offset), 12);
        assert_eq!(u32_at(index_offset + 4), 24);
        assert_eq!(bytes.len(), index_offset + 8);

        let mut r = StreamReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(r.keyframe_index().unwrap(), vec![12, 24]);
        let mut buf = Vec::new();
        let mut records = Vec::new();
        while let Some(n) = r.next_record(&mut buf).unwrap() {
            assert_eq!(n, buf.len());
            records.push(buf.clone());
        }
        assert_eq!(records, vec![vec![1, 2, 3], vec![4], vec![5, 6]]);
    }

    #[test]
    fn truncated_record_reported() {
        let mut w = StreamWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write_record(&[9; 10], true).unwrap();
        let mut bytes = w.finish().unwrap().into_inner();
        bytes.truncate(12 + 4 + 6);

        let mut r = StreamReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            r.next_record(&mut Vec::new()),
            Err(StreamError::Truncated(_))
        ));
        assert!(matches!(
            StreamReader::new(Cursor::new(vec![1, 0, 0])),
            Err(StreamError::Truncated(_))
        ));
    }

    #[test]
    fn stream_roundtrip_with_keyframe_interval() {
        let (w, h) = (20, 12);
        let raw = raw_frames(w, h, 7);
        let job = EncodeJob {
            keyframe_interval: 3,
            ..EncodeJob::new(w, h, PixelFormat::Bpp8)
        };
        let (out, enc) = encode_stream(Cursor::new(&raw), Cursor::new(Vec::new()), &job).unwrap();
        let stream = out.into_inner();
        assert_eq!(enc.frames, 7);
        assert_eq!(enc.keyframes, 3);
        assert_eq!(enc.input_size, raw.len() as u64);
        assert_eq!(enc.output_size, stream.len() as u64);

        let mut decoded = Vec::new();
        let dec = decode_stream(Cursor::new(&stream), &mut decoded, w, h, OutputLayout::Raw).unwrap();
        assert_eq!(decoded, raw);
        assert_eq!(dec.frames, 7);
        assert_eq!(dec.keyframes, 3);
        assert_eq!(dec.input_size, stream.len() as u64);
        #[cfg(feature = "file-io")]
        assert_eq!(dec.output_sha256, enc.input_sha256);
    }

    #[test]
    fn partial_raw_frame_is_truncated() {
        let raw = vec![0u8; 4 * 4 * 2 + 5];
        let job = EncodeJob::new(4, 4, PixelFormat::Bpp16);
        assert!(matches!(
            encode_stream(Cursor::new(raw), Cursor::new(Vec::new()), &job),
            Err(StreamError::Truncated(_))
        ));
    }

    #[test]
    fn file_roundtrip_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frames.raw");
        let stream = dir.path().join("frames.zmbv");
        let output = dir.path().join("frames.rgb");

        let pixels: Vec<u8> = (0..6 * 3 * 4).map(|i| i as u8).collect();
        std::fs::write(&input, &pixels).unwrap();
        let job = EncodeJob::new(6, 3, PixelFormat::Bpp32);
        let enc = encode_file(&input, &stream, &job).unwrap();
        assert_eq!(enc.frames, 1);

        let dec = decode_file(&stream, &output, 6, 3, OutputLayout::Rgb24(ExportOptions::default()))
            .unwrap();
        assert_eq!(dec.output_size, 6 * 3 * 3);
        let rgb = std::fs::read(&output).unwrap();
        assert_eq!(&rgb[..6], &[2, 1, 0, 6, 5, 4]);
    }
}
