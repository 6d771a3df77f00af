//! Error types and handling for the de-identification pipeline

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Custom result type for de-identification operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for de-identification operations
#[derive(Error, Debug)]
#[non_exhaustive]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Concurrency error: {0}")]
    Concurrency(String),
}

impl Error {
    /// Stable tag identifying which stage failed
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Extraction(_) => "extraction",
            Error::Classification(_) => "classification",
            Error::Composition(_) => "composition",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Concurrency(_) => "concurrency",
        }
    }
}

// -------------------- Stage Error Categories --------------------

/// Malformed or unreadable input document
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExtractionError {
    #[error("Cannot open document: {0}")]
    Open(String),

    #[error("Document has no pages")]
    NoPages,

    #[error("Cannot read content of page {page}: {reason}")]
    PageContent { page: u32, reason: String },

    #[error("Malformed content stream on page {page}: {reason}")]
    ContentStream { page: u32, reason: String },
}

/// Classifier unavailable or raised an internal fault
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ClassificationError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier failed on token {token:?}: {reason}")]
    Fault { token: String, reason: String },
}

/// Output-stream faults while composing the redacted document
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CompositionError {
    #[error("Content stream encoding failed on page {page}: {reason}")]
    Encode { page: u32, reason: String },

    #[error("Stream compression failed: {0}")]
    Compress(String),

    #[error("Document serialization failed: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_tags() {
        let err: Error = ExtractionError::NoPages.into();
        assert_eq!(err.kind(), "extraction");

        let err: Error = ClassificationError::Unavailable("model not loaded".into()).into();
        assert_eq!(err.kind(), "classification");

        let err: Error = CompositionError::Serialize("disk full".into()).into();
        assert_eq!(err.kind(), "composition");
    }

    #[test]
    fn test_error_display_includes_context() {
        let err = ClassificationError::Fault {
            token: "John".into(),
            reason: "tensor shape".into(),
        };
        let text = Error::from(err).to_string();
        assert!(text.starts_with("Classification error"));
        assert!(text.contains("\"John\""));
    }
}
