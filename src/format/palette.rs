// 256-entry RGB palette and its full / XOR-diff serialization.

use super::pixel::PALETTE_ENTRIES;

/// Serialized palette size in bytes (256 RGB triples).
pub const PALETTE_BYTES: usize = PALETTE_ENTRIES * 3;

/// A 256-entry RGB palette.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    rgb: [u8; PALETTE_BYTES],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            rgb: [0; PALETTE_BYTES],
        }
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self
            .rgb
            .chunks_exact(3)
            .rposition(|c| c.iter().any(|&b| b != 0))
            .map_or(0, |i| i + 1);
        write!(f, "Palette({used} entries in use)")
    }
}

impl Palette {
    /// Build from packed RGB triples. Missing entries are black; extra bytes
    /// beyond 256 entries are ignored.
    pub fn from_rgb(data: &[u8]) -> Self {
        let mut pal = Self::default();
        let n = data.len().min(PALETTE_BYTES) / 3 * 3;
        pal.rgb[..n].copy_from_slice(&data[..n]);
        pal
    }

    /// Build from packed RGBA quads; the fourth byte of each entry is ignored.
    pub fn from_rgba(data: &[u8]) -> Self {
        let mut pal = Self::default();
        for (dst, src) in pal.rgb.chunks_exact_mut(3).zip(data.chunks_exact(4)) {
            dst.copy_from_slice(&src[..3]);
        }
        pal
    }

    /// RGB triple for palette index `index`.
    pub fn entry(&self, index: u8) -> [u8; 3] {
        let i = index as usize * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }

    /// Set one entry.
    pub fn set_entry(&mut self, index: u8, rgb: [u8; 3]) {
        let i = index as usize * 3;
        self.rgb[i..i + 3].copy_from_slice(&rgb);
    }

    /// Packed RGB bytes.
    pub fn as_bytes(&self) -> &[u8; PALETTE_BYTES] {
        &self.rgb
    }

    /// Append the XOR diff that turns `self` into `next`.
    pub(crate) fn write_diff(&self, next: &Palette, out: &mut Vec<u8>) {
        out.extend(self.rgb.iter().zip(next.rgb.iter()).map(|(a, b)| a ^ b));
    }

    /// XOR a transmitted diff into the stored palette.
    pub(crate) fn apply_diff(&mut self, diff: &[u8]) {
        for (dst, d) in self.rgb.iter_mut().zip(diff) {
            *dst ^= d;
        }
    }

    /// Replace the palette with transmitted bytes.
    pub(crate) fn load(&mut self, data: &[u8]) {
        self.rgb.copy_from_slice(&data[..PALETTE_BYTES]);
    }
}
