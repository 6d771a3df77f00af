//! Positioned text spans and per-token classification decisions

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{BBox, RgbColor};

/// Font used when a span carries no usable font name
pub const DEFAULT_FONT_NAME: &str = "Helvetica";

/// Font size used when the source does not provide one
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// One positioned, homogeneously styled run of text on a page.
///
/// `bbox.y0` is the text baseline measured from the top of the source page, so
/// flipping it with the page height yields the drawing origin. `bbox.y1` sits one
/// em below the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Zero-based page number
    pub page_index: u32,
    /// Visible characters, trimmed
    pub text: String,
    /// Position in top-left-origin page space
    pub bbox: BBox,
    /// Font identifier as reported by the source
    pub font_name: String,
    /// Effective font size in points
    pub font_size: f32,
    /// Fill color
    pub color: RgbColor,
}

impl TextSpan {
    /// Creates a span with default font, size and color
    pub fn new(page_index: u32, text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            page_index,
            text: text.into(),
            bbox,
            font_name: DEFAULT_FONT_NAME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            color: RgbColor::BLACK,
        }
    }

    pub fn with_font(mut self, font_name: impl Into<String>, font_size: f32) -> Self {
        let name = font_name.into();
        self.font_name = if name.trim().is_empty() {
            DEFAULT_FONT_NAME.to_string()
        } else {
            name
        };
        self.font_size = if font_size.is_finite() && font_size > 0.0 {
            font_size
        } else {
            DEFAULT_FONT_SIZE
        };
        self
    }

    pub fn with_color(mut self, color: RgbColor) -> Self {
        self.color = color;
        self
    }

    /// Returns a new span at the same position and style carrying `text`
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Reading order: page first, then top-to-bottom
    pub fn reading_order(&self, other: &TextSpan) -> Ordering {
        self.page_index
            .cmp(&other.page_index)
            .then_with(|| self.bbox.y0.total_cmp(&other.bbox.y0))
    }
}

/// Stable sort into reading order
pub fn sort_spans(spans: &mut [TextSpan]) {
    spans.sort_by(|a, b| a.reading_order(b));
}

/// Checks the ordering invariant relied upon by the composer
pub fn is_reading_ordered(spans: &[TextSpan]) -> bool {
    spans
        .windows(2)
        .all(|pair| pair[0].reading_order(&pair[1]) != Ordering::Greater)
}

/// Outcome of classifying one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationDecision {
    pub token: String,
    pub is_pii: bool,
}
