//! Configuration types and validation for the pipeline

use std::{collections::HashMap, fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::output::font_registry::is_standard_font;

/// Global pipeline execution config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub extraction: ExtractionConfig,
    pub redaction: RedactionConfig,
    pub composition: CompositionConfig,
    pub classifier: ClassifierConfig,
    pub logging: LoggingConfig,
}

/// Span extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Merge adjacent same-style runs on one baseline into a single span
    pub merge_runs: bool,
    /// Maximum nesting of form XObjects followed while extracting
    pub max_form_depth: usize,
}

/// Redaction stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Classify spans on a worker pool
    pub parallel: bool,
    /// Worker pool size, defaults to the number of CPUs
    pub worker_threads: Option<usize>,
}

/// Target page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    Letter,
    Legal,
    A4,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A4 => (595.0, 842.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }

    pub fn height(&self) -> f32 {
        self.dimensions().1
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Letter
    }
}

/// Page composition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    pub page_size: PageSize,
    /// Standard font used when a span's font cannot be selected
    pub default_font: String,
    /// Source font name (after comma normalization) to standard font
    pub font_aliases: HashMap<String, String>,
    /// Flate-compress page content streams
    pub compress_streams: bool,
}

/// Built-in classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Named rule sets: email, phone, ssn, date, digits
    pub rules: Vec<String>,
    /// Additional regular expressions matched against whole tokens
    pub extra_patterns: Vec<String>,
    /// Word list of known PII tokens, one per line
    pub lexicon_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

// Defaults
impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            merge_runs: true,
            max_form_depth: 8,
        }
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            worker_threads: None,
        }
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        let aliases = [
            ("Arial", "Helvetica"),
            ("ArialMT", "Helvetica"),
            ("Arial-Bold", "Helvetica-Bold"),
            ("Arial-BoldMT", "Helvetica-Bold"),
            ("Arial-Italic", "Helvetica-Oblique"),
            ("Arial-ItalicMT", "Helvetica-Oblique"),
            ("Arial-BoldItalic", "Helvetica-BoldOblique"),
            ("Arial-BoldItalicMT", "Helvetica-BoldOblique"),
            ("TimesNewRoman", "Times-Roman"),
            ("TimesNewRomanPSMT", "Times-Roman"),
            ("TimesNewRoman-Bold", "Times-Bold"),
            ("TimesNewRomanPS-BoldMT", "Times-Bold"),
            ("TimesNewRoman-Italic", "Times-Italic"),
            ("TimesNewRomanPS-ItalicMT", "Times-Italic"),
            ("CourierNew", "Courier"),
            ("CourierNewPSMT", "Courier"),
            ("CourierNew-Bold", "Courier-Bold"),
            ("CourierNewPS-BoldMT", "Courier-Bold"),
        ];

        Self {
            page_size: PageSize::Letter,
            default_font: "Helvetica".into(),
            font_aliases: aliases
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            compress_streams: true,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: vec!["email".into(), "phone".into(), "ssn".into(), "date".into()],
            extra_patterns: Vec::new(),
            lexicon_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl ProcessingConfig {
    /// Loads a configuration file, trying JSON first, then YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ProcessingConfig = serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e| Error::Config(format!("Config parsing error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.composition.page_size.dimensions();
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(Error::Config(format!("Invalid page size {}x{}", width, height)));
        }
        if !is_standard_font(&self.composition.default_font) {
            return Err(Error::Config(format!(
                "Default font must be a standard PDF font, got {}",
                self.composition.default_font
            )));
        }
        for (from, to) in &self.composition.font_aliases {
            if !is_standard_font(to) {
                return Err(Error::Config(format!("Alias {} targets non-standard font {}", from, to)));
            }
        }
        if self.redaction.worker_threads == Some(0) {
            return Err(Error::Config("Worker threads must be at least 1".into()));
        }
        if self.extraction.max_form_depth > 64 {
            return Err(Error::Config("Form XObject depth limit too large".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProcessingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.composition.page_size.dimensions(), (612.0, 792.0));
        assert_eq!(config.composition.default_font, "Helvetica");
    }

    #[test]
    fn test_yaml_partial_config() {
        let yaml = "composition:\n  page_size: a4\n  compress_streams: false\nredaction:\n  worker_threads: 2\n";
        let config = ProcessingConfig::parse(yaml).unwrap();
        assert_eq!(config.composition.page_size, PageSize::A4);
        assert!(!config.composition.compress_streams);
        assert_eq!(config.redaction.worker_threads, Some(2));
        // untouched sections keep their defaults
        assert!(config.extraction.merge_runs);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_json_custom_page_size() {
        let json = r#"{"composition": {"page_size": {"custom": {"width": 300.0, "height": 400.0}}}}"#;
        let config = ProcessingConfig::parse(json).unwrap();
        assert_eq!(config.composition.page_size.height(), 400.0);
    }

    #[test]
    fn test_rejects_non_standard_default_font() {
        let mut config = ProcessingConfig::default();
        config.composition.default_font = "Comic Sans".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = ProcessingConfig::default();
        config.redaction.worker_threads = Some(0);
        assert!(config.validate().is_err());
    }
}
