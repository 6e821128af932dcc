// Frame decoder.
//
// decode_frame() takes one wire record:
//   1. tag byte, then (keyframes) the 6-byte header, all validated first
//   2. reconfigure on a format or block geometry change
//   3. inflate the payload into the work buffer
//   4. validate the work buffer against the block table
//   5. only then touch the frame buffers: keyframes overwrite the fixed
//      current buffer, delta frames swap roles and rebuild from vectors
//
// A record that fails in steps 1, 3 or 4 leaves the visible frame unchanged.
// A keyframe that reconfigured in step 2 has already dropped the old
// buffers; if it then fails, the store is released so that nothing decodes
// until the next good keyframe.

use log::{debug, trace};

use crate::error::{Result, ZmbvError};
use crate::format::header::KEYFRAME_HEADER_LEN;
use crate::format::{FrameTag, KeyframeHeader, PALETTE_BYTES, Palette, PixelFormat};
use crate::motion::{FrameStore, delta};

use super::FrameInfo;
use super::entropy::{self, EntropyStage};

/// ZMBV decoder for one stream.
pub struct FrameDecoder {
    store: FrameStore,
    entropy: Box<dyn EntropyStage>,
    palette: Palette,
    last: Option<FrameInfo>,
}

impl std::fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("store", &self.store)
            .field("palette", &self.palette)
            .field("last", &self.last)
            .finish()
    }
}

impl FrameDecoder {
    /// Create a decoder for `width x height` frames. The first record must
    /// be a keyframe.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            store: FrameStore::new(width, height)?,
            entropy: entropy::decoder_stage(Default::default()),
            palette: Palette::default(),
            last: None,
        })
    }

    /// Change frame dimensions. The next record must be a keyframe.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        self.store.resize(width, height)?;
        self.last = None;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.store.width()
    }

    pub fn height(&self) -> usize {
        self.store.height()
    }

    /// Format of the last keyframe.
    pub fn format(&self) -> Option<PixelFormat> {
        self.store.format()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Summary of the last successfully decoded record.
    pub fn last_frame(&self) -> Option<&FrameInfo> {
        self.last.as_ref()
    }

    /// Scanline `index` of the reconstructed frame.
    pub fn line(&self, index: usize) -> Option<&[u8]> {
        self.store.row(index)
    }

    /// All scanlines, top to bottom. Empty before the first keyframe.
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.store.height()).map_while(|y| self.store.row(y))
    }

    /// Whether `record` carries a full palette (8bpp keyframe) or a palette
    /// diff, without decoding it.
    pub fn palette_changed(record: &[u8]) -> bool {
        let Some(tag) = record.first().and_then(|&b| FrameTag::parse(b).ok()) else {
            return false;
        };
        if tag.is_keyframe() {
            KeyframeHeader::decode(record.get(1..).unwrap_or_default())
                .is_ok_and(|h| h.format.is_palettized())
        } else {
            tag.contains(FrameTag::DELTA_PALETTE)
        }
    }

    /// Decode one record into the current frame.
    pub fn decode_frame(&mut self, record: &[u8]) -> Result<FrameInfo> {
        if record.len() < 2 {
            return Err(ZmbvError::malformed(format!(
                "record of {} bytes is too short",
                record.len()
            )));
        }
        let tag = FrameTag::parse(record[0])?;
        let info = if tag.is_keyframe() {
            self.decode_keyframe(tag, record)?
        } else {
            self.decode_delta(tag, record)?
        };
        trace!(
            "decoded frame: tag {:#04x}, payload {} bytes, work {} bytes",
            info.tag.bits(),
            info.payload_size,
            info.work_size
        );
        self.last = Some(info);
        Ok(info)
    }

    fn decode_keyframe(&mut self, tag: FrameTag, record: &[u8]) -> Result<FrameInfo> {
        let header = KeyframeHeader::decode(&record[1..])?;
        let payload = &record[1 + KEYFRAME_HEADER_LEN..];
        if payload.is_empty() {
            return Err(ZmbvError::malformed("keyframe without payload"));
        }

        let geometry = (header.block_width as usize, header.block_height as usize);
        let reconfigure =
            self.store.format() != Some(header.format) || self.store.block_size() != geometry;
        if reconfigure {
            debug!(
                "decoder: reconfiguring for {} with {}x{} blocks",
                header.format, geometry.0, geometry.1
            );
            self.store.setup(header.format, geometry.0, geometry.1)?;
        }
        if self.entropy.compression() != header.compression {
            self.entropy = entropy::decoder_stage(header.compression);
        } else {
            self.entropy.reset();
        }

        let result = self.load_keyframe(tag, header, payload);
        if result.is_err() && reconfigure {
            debug!("decoder: keyframe rejected after reconfiguring, releasing buffers");
            self.store.release();
            self.last = None;
        }
        result
    }

    fn load_keyframe(
        &mut self,
        tag: FrameTag,
        header: KeyframeHeader,
        payload: &[u8],
    ) -> Result<FrameInfo> {
        self.inflate(payload)?;

        let palette_len = if header.format.is_palettized() {
            PALETTE_BYTES
        } else {
            0
        };
        let expected = palette_len
            + self.store.width() * self.store.height() * header.format.bytes_per_pixel();
        let work_size = self.store.work().len();
        if work_size != expected {
            return Err(ZmbvError::malformed(format!(
                "keyframe payload is {work_size} bytes, expected {expected}"
            )));
        }

        if palette_len > 0 {
            self.palette.load(&self.store.work()[..palette_len]);
        }
        self.store.reset_roles();
        self.store.load_current_rows_from_work(palette_len);

        Ok(FrameInfo {
            tag,
            header: Some(header),
            format: header.format,
            work_size,
            payload_size: payload.len(),
            delta: None,
        })
    }

    fn decode_delta(&mut self, tag: FrameTag, record: &[u8]) -> Result<FrameInfo> {
        let Some(format) = self.store.format() else {
            return Err(ZmbvError::malformed("delta frame before any keyframe"));
        };
        let payload = &record[1..];
        self.inflate(payload)?;

        let palette_len = if tag.contains(FrameTag::DELTA_PALETTE) && format.is_palettized() {
            PALETTE_BYTES
        } else {
            0
        };
        let bpp = format.bytes_per_pixel();
        let work = self.store.work();
        if work.len() < palette_len {
            return Err(ZmbvError::malformed("palette diff truncated"));
        }
        let stats = delta::validate_delta(work, palette_len, self.store.blocks(), bpp)?;
        let work_size = work.len();

        if palette_len > 0 {
            self.palette.apply_diff(&self.store.work()[..palette_len]);
        }
        self.store.swap();
        delta::apply_delta(self.store.parts(), palette_len, bpp);

        Ok(FrameInfo {
            tag,
            header: None,
            format,
            work_size,
            payload_size: payload.len(),
            delta: Some(stats),
        })
    }

    /// Run `payload` through the entropy stage into the cleared work buffer.
    fn inflate(&mut self, payload: &[u8]) -> Result<()> {
        let limit = self.store.work_capacity();
        // Incompressible data grows a little under deflate.
        if payload.len() > limit + limit / 1000 + 64 {
            return Err(ZmbvError::malformed(format!(
                "payload of {} bytes exceeds the {limit} byte work buffer",
                payload.len()
            )));
        }
        let work = self.store.work_mut();
        work.clear();
        self.entropy.transform(payload, work, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder::{EncodeOptions, FrameEncoder};
    use crate::format::CompressionMode;

    fn encode_pair(format: PixelFormat, a: &[u8], b: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut enc = FrameEncoder::new(4, 4, EncodeOptions::default()).unwrap();
        let mut first = Vec::new();
        enc.encode_frame(format, None, a, false, &mut first).unwrap();
        let mut second = Vec::new();
        enc.encode_frame(format, None, b, false, &mut second).unwrap();
        (first, second)
    }

    fn frame_of(dec: &FrameDecoder) -> Vec<u8> {
        dec.lines().flatten().copied().collect()
    }

    #[test]
    fn keyframe_then_delta() {
        let a: Vec<u8> = (0..32).collect();
        let b: Vec<u8> = (0..32).map(|i| i ^ 0x55).collect();
        let (first, second) = encode_pair(PixelFormat::Bpp16, &a, &b);

        let mut dec = FrameDecoder::new(4, 4).unwrap();
        assert!(dec.decode_frame(&first).unwrap().is_keyframe());
        assert_eq!(frame_of(&dec), a);
        let info = dec.decode_frame(&second).unwrap();
        assert!(!info.is_keyframe());
        assert_eq!(frame_of(&dec), b);
        assert_eq!(dec.last_frame(), Some(&info));
    }

    #[test]
    fn short_record_leaves_state() {
        let (first, _) = encode_pair(PixelFormat::Bpp8, &[7; 16], &[7; 16]);
        let mut dec = FrameDecoder::new(4, 4).unwrap();
        dec.decode_frame(&first).unwrap();
        assert!(matches!(
            dec.decode_frame(&[0x00]),
            Err(ZmbvError::MalformedFrame(_))
        ));
        assert_eq!(frame_of(&dec), vec![7; 16]);
    }

    #[test]
    fn delta_before_keyframe_rejected() {
        let (_, second) = encode_pair(PixelFormat::Bpp8, &[1; 16], &[2; 16]);
        let mut dec = FrameDecoder::new(4, 4).unwrap();
        assert!(matches!(
            dec.decode_frame(&second),
            Err(ZmbvError::MalformedFrame(_))
        ));
        assert_eq!(dec.lines().count(), 0);
    }

    #[test]
    fn reserved_tag_bits_rejected() {
        let mut dec = FrameDecoder::new(4, 4).unwrap();
        assert!(matches!(
            dec.decode_frame(&[0x04, 0x00]),
            Err(ZmbvError::MalformedFrame(_))
        ));
    }

    #[test]
    fn stored_keyframe_length_must_match() {
        let mut record = vec![0x01, 0, 1, 0, 0x06, 16, 16];
        record.extend_from_slice(&[0xab; 31]);
        let mut dec = FrameDecoder::new(4, 4).unwrap();
        assert!(matches!(
            dec.decode_frame(&record),
            Err(ZmbvError::MalformedFrame(_))
        ));
        record.push(0xab);
        dec.decode_frame(&record).unwrap();
        assert_eq!(dec.line(3).unwrap(), &[0xab; 8]);
    }

    #[test]
    fn compression_mode_follows_keyframes() {
        let stored = EncodeOptions {
            compression: CompressionMode::None,
            ..EncodeOptions::default()
        };
        let mut plain = FrameEncoder::new(4, 4, stored).unwrap();
        let mut zlib = FrameEncoder::new(4, 4, EncodeOptions::default()).unwrap();
        let mut dec = FrameDecoder::new(4, 4).unwrap();

        for (i, enc) in [&mut plain, &mut zlib].into_iter().enumerate() {
            let pixels = vec![i as u8 + 1; 64];
            let mut record = Vec::new();
            enc.encode_frame(PixelFormat::Bpp32, None, &pixels, false, &mut record)
                .unwrap();
            dec.decode_frame(&record).unwrap();
            assert_eq!(frame_of(&dec), pixels);
        }
    }

    #[test]
    fn palette_peek() {
        let mut pal = Palette::default();
        pal.set_entry(3, [9, 9, 9]);
        let mut enc = FrameEncoder::new(4, 4, EncodeOptions::default()).unwrap();
        let mut key = Vec::new();
        enc.encode_frame(PixelFormat::Bpp8, Some(&pal), &[3; 16], false, &mut key)
            .unwrap();
        let mut same = Vec::new();
        enc.encode_frame(PixelFormat::Bpp8, Some(&pal), &[3; 16], false, &mut same)
            .unwrap();
        pal.set_entry(3, [1, 1, 1]);
        let mut changed = Vec::new();
        enc.encode_frame(PixelFormat::Bpp8, Some(&pal), &[3; 16], false, &mut changed)
            .unwrap();

        assert!(FrameDecoder::palette_changed(&key));
        assert!(!FrameDecoder::palette_changed(&same));
        assert!(FrameDecoder::palette_changed(&changed));
        assert!(!FrameDecoder::palette_changed(&[]));

        let mut dec = FrameDecoder::new(4, 4).unwrap();
        for record in [&key, &same, &changed] {
            dec.decode_frame(record).unwrap();
        }
        assert_eq!(dec.palette(), &pal);
    }
}
