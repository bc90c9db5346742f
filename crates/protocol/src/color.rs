use serde::{Deserialize, Serialize};

/// A color in the Oklch perceptual space.
///
/// `l` is lightness in `[0, 1]`, `c` is chroma (unbounded in theory, about
/// `0.37` at most for sRGB-representable colors) and `h` is the hue angle in
/// degrees. Conversion to a display color is the renderer's job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oklch {
    pub l: f32,
    pub c: f32,
    pub h: f32,
    pub alpha: f32,
}

impl Oklch {
    pub const fn new(l: f32, c: f32, h: f32) -> Self {
        Self { l, c, h, alpha: 1.0 }
    }

    /// Build from a lightness given in percent, the way palettes are
    /// usually written down (`oklch(58.51% 0.122 143.74)`).
    pub const fn from_percent(l: f32, c: f32, h: f32) -> Self {
        Self::new(l / 100.0, c, h)
    }

    /// Shift lightness (in percent) and chroma, keeping both in range.
    #[must_use]
    pub fn shifted(self, dl: f32, dc: f32) -> Self {
        Self {
            l: self.l + dl / 100.0,
            c: (self.c + dc).max(0.0),
            ..self
        }
        .clamped()
    }

    /// Add `delta` to lightness and clamp it to `[0, 1]`.
    #[must_use]
    pub fn lightened(self, delta: f32) -> Self {
        Self {
            l: self.l + delta,
            ..self
        }
        .clamped()
    }

    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            l: self.l.clamp(0.0, 1.0),
            ..self
        }
    }
}
