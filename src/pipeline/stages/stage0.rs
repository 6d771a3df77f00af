//! Stage 0: Span Extraction
//!
//! Parses the source document into reading-ordered text spans. Any unreadable
//! page fails the stage; there is no partial span list.

use std::time::{Duration, Instant};

use tracing::{info, instrument};

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::extractor::SpanExtractor;
use crate::types::TextSpan;

#[derive(Debug, Clone)]
pub struct Stage0Result {
    pub spans: Vec<TextSpan>,
    pub page_count: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct Stage0Processor {
    extractor: SpanExtractor,
}

impl Stage0Processor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            extractor: SpanExtractor::new(config),
        }
    }

    #[instrument(name = "stage0_extraction", skip_all)]
    pub fn execute(&self, document_bytes: &[u8]) -> Result<Stage0Result, ExtractionError> {
        let started = Instant::now();
        let extraction = self.extractor.extract_document(document_bytes)?;
        info!(
            pages = extraction.page_count,
            spans = extraction.spans.len(),
            "Stage 0: extraction complete"
        );
        Ok(Stage0Result {
            spans: extraction.spans,
            page_count: extraction.page_count,
            elapsed: started.elapsed(),
        })
    }
}
