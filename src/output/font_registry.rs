//! Standard font lookup for re-rendered pages

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::config::CompositionConfig;

/// The 14 fonts every PDF reader provides without embedding
pub const STANDARD_FONTS: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-BoldOblique",
    "Courier-Oblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-BoldOblique",
    "Helvetica-Oblique",
    "Symbol",
    "Times-Bold",
    "Times-BoldItalic",
    "Times-Italic",
    "Times-Roman",
    "ZapfDingbats",
];

pub fn is_standard_font(name: &str) -> bool {
    STANDARD_FONTS.contains(&name)
}

/// Source fonts write style suffixes as `Family,Style`; the registry uses hyphens
pub fn normalize_font_name(name: &str) -> String {
    name.trim().replace(',', "-")
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Font not in registry: {0}")]
pub struct UnknownFont(pub String);

/// Maps source font names to standard fonts
#[derive(Debug, Clone)]
pub struct FontRegistry {
    aliases: HashMap<String, String>,
    default_font: String,
}

impl FontRegistry {
    pub fn new(config: &CompositionConfig) -> Self {
        Self {
            aliases: config
                .font_aliases
                .iter()
                .map(|(from, to)| (normalize_font_name(from), to.clone()))
                .collect(),
            default_font: config.default_font.clone(),
        }
    }

    pub fn default_font(&self) -> &str {
        &self.default_font
    }

    /// Resolves a source font name to a standard font
    pub fn lookup(&self, font_name: &str) -> Result<&str, UnknownFont> {
        let normalized = normalize_font_name(font_name);
        if let Some(standard) = STANDARD_FONTS.iter().find(|f| **f == normalized) {
            return Ok(*standard);
        }
        self.aliases
            .get(&normalized)
            .map(String::as_str)
            .ok_or(UnknownFont(normalized))
    }

    /// Like [`lookup`](Self::lookup), degrading to the default font
    pub fn select(&self, font_name: &str) -> &str {
        match self.lookup(font_name) {
            Ok(font) => font,
            Err(e) => {
                debug!("{}, using {}", e, self.default_font);
                &self.default_font
            }
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new(&CompositionConfig::default())
    }
}
