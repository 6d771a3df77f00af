//! Main Library File for PDF De-identification
//! Provides a layout-preserving pipeline that extracts positioned text,
//! redacts PII in field values and re-renders the document.

// Configuration and Core Pipeline
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// Stage 0: Span Extraction
pub mod extractor;

// Stage 1: Classification & Redaction
pub mod redaction;

// Stage 2: Page Composition
pub mod output;

// Reporting & Utilities
pub mod report;
pub mod utils;

pub use config::ProcessingConfig;
pub use error::{ClassificationError, CompositionError, Error, ExtractionError, Result};
pub use extractor::SpanExtractor;
pub use output::PageComposer;
pub use pipeline::{Pipeline, PipelineState, RedactionOutcome};
pub use redaction::{FieldSplitter, PiiClassifier, Redactor, RuleClassifier, REDACTION_MARKER};
pub use report::RedactionReport;
pub use types::{BBox, ClassificationDecision, RgbColor, TextSpan};
pub use utils::{Logger, Metrics};
