use anyhow::{anyhow, Result};

/// The ten-glyph ramp used when nothing else is configured.
pub const DEFAULT_RAMP: &str = " .:-=+*#%@";

/// Ordered glyphs from darkest to lightest, with a precomputed lookup
/// table from brightness (0-255) to glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<u8>,
    lut: [u8; 256],
}

impl GlyphRamp {
    /// Build a ramp from a string of ASCII glyphs, darkest first.
    ///
    /// # Errors
    ///
    /// Fails if `glyphs` is empty or contains non-ASCII characters (every
    /// glyph must occupy exactly one terminal cell and one byte).
    pub fn new(glyphs: &str) -> Result<Self> {
        if glyphs.is_empty() {
            return Err(anyhow!("glyph ramp cannot be empty"));
        }
        if !glyphs.is_ascii() {
            return Err(anyhow!(
                "glyph ramp '{}' contains non-ASCII characters. Please use only ASCII characters.",
                glyphs
            ));
        }

        Ok(Self::build(glyphs.as_bytes()))
    }

    fn build(glyphs: &[u8]) -> Self {
        let last = glyphs.len() - 1;
        let mut lut = [0u8; 256];
        for (value, slot) in lut.iter_mut().enumerate() {
            *slot = glyphs[Self::bucket(value, last)];
        }
        Self {
            glyphs: glyphs.to_vec(),
            lut,
        }
    }

    // floor(v / 255 * last) in integer arithmetic, clamped.
    fn bucket(value: usize, last: usize) -> usize {
        (value * last / 255).min(last)
    }

    /// Index into the ramp selected for a brightness sample.
    pub fn index_of(&self, value: u8) -> usize {
        Self::bucket(value as usize, self.glyphs.len() - 1)
    }

    /// Glyph selected for a brightness sample.
    #[inline]
    pub fn glyph(&self, value: u8) -> char {
        self.lut[value as usize] as char
    }

    /// Map a row of samples onto `out`, one glyph per sample.
    pub fn map_into(&self, samples: &[u8], out: &mut String) {
        out.extend(samples.iter().map(|&v| self.lut[v as usize] as char));
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn first(&self) -> char {
        self.glyphs[0] as char
    }

    pub fn last(&self) -> char {
        self.glyphs[self.glyphs.len() - 1] as char
    }

    pub fn contains(&self, ch: char) -> bool {
        ch.is_ascii() && self.glyphs.contains(&(ch as u8))
    }

    pub fn as_str(&self) -> &str {
        // Construction only accepts ASCII.
        std::str::from_utf8(&self.glyphs).unwrap_or_default()
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self::build(DEFAULT_RAMP.as_bytes())
    }
}
