//! Normalized RGB color and conversions from PDF color spaces

use serde::{Deserialize, Serialize};

/// Fill color with components in `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor { r: 0.0, g: 0.0, b: 0.0 };

    /// Builds a color, clamping every component into range
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
        }
    }

    pub fn from_gray(gray: f32) -> Self {
        Self::new(gray, gray, gray)
    }

    /// Naive CMYK conversion, matching what most viewers do without an ICC profile
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        let k = clamp_unit(k);
        Self::new(
            (1.0 - clamp_unit(c)) * (1.0 - k),
            (1.0 - clamp_unit(m)) * (1.0 - k),
            (1.0 - clamp_unit(y)) * (1.0 - k),
        )
    }

    /// Interprets operands of a component color operator by their count.
    /// Returns `None` for pattern or unsupported color spaces.
    pub fn from_components(components: &[f32]) -> Option<Self> {
        match components {
            [gray] => Some(Self::from_gray(*gray)),
            [r, g, b] => Some(Self::new(*r, *g, *b)),
            [c, m, y, k] => Some(Self::from_cmyk(*c, *m, *y, *k)),
            _ => None,
        }
    }

    pub fn components(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
