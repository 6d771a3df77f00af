//! Stage 2: Page Composition
//!
//! Re-renders the redacted spans onto fresh pages at their original positions.

use std::time::{Duration, Instant};

use tracing::{info, instrument};

use crate::config::CompositionConfig;
use crate::error::CompositionError;
use crate::output::PageComposer;
use crate::types::TextSpan;

#[derive(Debug, Clone)]
pub struct Stage2Result {
    pub document: Vec<u8>,
    pub page_count: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct Stage2Processor {
    composer: PageComposer,
}

impl Stage2Processor {
    pub fn new(config: CompositionConfig) -> Self {
        Self {
            composer: PageComposer::new(config),
        }
    }

    #[instrument(name = "stage2_composition", skip_all, fields(spans = spans.len()))]
    pub fn execute(&self, spans: &[TextSpan]) -> Result<Stage2Result, CompositionError> {
        let started = Instant::now();
        let document = self.composer.compose(spans)?;
        let page_count = output_page_count(spans);
        info!(pages = page_count, bytes = document.len(), "Stage 2: composition complete");
        Ok(Stage2Result {
            document,
            page_count,
            elapsed: started.elapsed(),
        })
    }
}

/// Pages the composer emits: one per run of equal `page_index`, at least one
pub fn output_page_count(spans: &[TextSpan]) -> usize {
    let breaks = spans
        .windows(2)
        .filter(|pair| pair[0].page_index != pair[1].page_index)
        .count();
    breaks + 1
}
