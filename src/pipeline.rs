//! PDF De-identification Pipeline: Stage-by-Stage Execution
//!
//! Extraction, redaction and composition for one document at a time. A run
//! either yields the complete redacted document or an error; nothing partial
//! ever leaves the pipeline.

pub mod stages;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::ProcessingConfig;
use crate::error::{Error, Result};
use crate::redaction::PiiClassifier;
use crate::report::{RedactionReport, StageDurations};
use crate::utils::Metrics;

use self::stages::{Stage0Processor, Stage1Processor, Stage2Processor};

/// Progress of one document through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Start,
    Extracted,
    Redacted,
    Composed,
    Done,
    Failed,
}

impl PipelineState {
    /// Next state after the current stage succeeds; terminal states stay put
    pub fn advance(self) -> Self {
        match self {
            PipelineState::Start => PipelineState::Extracted,
            PipelineState::Extracted => PipelineState::Redacted,
            PipelineState::Redacted => PipelineState::Composed,
            PipelineState::Composed => PipelineState::Done,
            terminal => terminal,
        }
    }

    /// `Failed` from any non-terminal state
    pub fn fail(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            PipelineState::Failed
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// A finished run: the composed document and what happened to it
#[derive(Debug, Clone)]
pub struct RedactionOutcome {
    pub document: Vec<u8>,
    pub report: RedactionReport,
}

/// De-identification pipeline.
///
/// Cheap to clone; clones share the classifier, the redaction pool and the
/// metrics, so one pipeline can serve many documents concurrently.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<ProcessingConfig>,
    classifier: Arc<dyn PiiClassifier>,
    stage0: Stage0Processor,
    stage1: Stage1Processor,
    stage2: Stage2Processor,
    metrics: Metrics,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("classifier", &self.classifier.name())
            .field("parallel_redaction", &self.stage1.is_parallel())
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    /// Validates the configuration and prepares every stage
    pub fn new(config: ProcessingConfig, classifier: Arc<dyn PiiClassifier>) -> Result<Self> {
        config.validate()?;
        let stage0 = Stage0Processor::new(config.extraction.clone());
        let stage1 = Stage1Processor::new(&config.redaction)?;
        let stage2 = Stage2Processor::new(config.composition.clone());

        info!(classifier = classifier.name(), "Pipeline ready");
        Ok(Self {
            config: Arc::new(config),
            classifier,
            stage0,
            stage1,
            stage2,
            metrics: Metrics::new(),
        })
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Runs all stages on one document.
    ///
    /// `document_id` only correlates logs and the report.
    #[instrument(skip(self, document_bytes), fields(size = document_bytes.len()))]
    pub fn process(&self, document_id: &str, document_bytes: &[u8]) -> Result<RedactionOutcome> {
        let started = Instant::now();
        let mut state = PipelineState::Start;

        match self.run_stages(&mut state, document_id, document_bytes) {
            Ok(mut outcome) => {
                outcome.report.durations.total_ms = StageDurations::millis(started.elapsed());
                self.metrics.increment_counter("documents_processed");
                self.metrics.record_duration("total", started.elapsed());
                info!(
                    record_id = %outcome.report.record_id,
                    redacted = outcome.report.redaction.tokens_redacted,
                    "Document de-identified"
                );
                Ok(outcome)
            }
            Err(e) => {
                let failed_after = state;
                state = state.fail();
                self.metrics.increment_counter("documents_failed");
                self.metrics.increment_counter(&format!("failures.{}", e.kind()));
                warn!(kind = e.kind(), after = ?failed_after, state = ?state, "Pipeline failed: {}", e);
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        state: &mut PipelineState,
        document_id: &str,
        document_bytes: &[u8],
    ) -> Result<RedactionOutcome> {
        let mut report = RedactionReport::new(document_id, self.classifier.name());

        let extracted = self.stage0.execute(document_bytes)?;
        *state = state.advance();
        self.metrics.record_duration("extraction", extracted.elapsed);
        report.source_pages = extracted.page_count;
        report.durations.extraction_ms = StageDurations::millis(extracted.elapsed);
        debug!(state = ?state, "Stage transition");

        let redacted = self.stage1.execute(&extracted.spans, self.classifier.as_ref())?;
        *state = state.advance();
        self.metrics.record_duration("redaction", redacted.elapsed);
        self.metrics
            .add_to_counter("tokens_redacted", redacted.stats.tokens_redacted as u64);
        report.redaction = redacted.stats;
        report.durations.redaction_ms = StageDurations::millis(redacted.elapsed);
        debug!(state = ?state, "Stage transition");

        let composed = self.stage2.execute(&redacted.spans)?;
        *state = state.advance();
        self.metrics.record_duration("composition", composed.elapsed);
        report.output_pages = composed.page_count;
        report.output_bytes = composed.document.len();
        report.durations.composition_ms = StageDurations::millis(composed.elapsed);

        *state = state.advance();
        debug!(state = ?state, "Stage transition");
        Ok(RedactionOutcome {
            document: composed.document,
            report,
        })
    }

    /// Runs [`process`](Self::process) on tokio's blocking pool.
    ///
    /// Dropping the returned future abandons the result; the run itself has no
    /// side effects to undo.
    pub async fn process_async(
        &self,
        document_id: impl Into<String>,
        document_bytes: Vec<u8>,
    ) -> Result<RedactionOutcome> {
        let pipeline = self.clone();
        let document_id = document_id.into();
        tokio::task::spawn_blocking(move || pipeline.process(&document_id, &document_bytes))
            .await
            .map_err(|e| Error::Concurrency(format!("Pipeline task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassificationError;

    fn never(_: &str) -> std::result::Result<bool, ClassificationError> {
        Ok(false)
    }

    #[test]
    fn test_state_transitions() {
        let mut state = PipelineState::Start;
        for expected in [
            PipelineState::Extracted,
            PipelineState::Redacted,
            PipelineState::Composed,
            PipelineState::Done,
        ] {
            state = state.advance();
            assert_eq!(state, expected);
        }
        assert_eq!(state.advance(), PipelineState::Done);
        assert_eq!(state.fail(), PipelineState::Done);
        assert_eq!(PipelineState::Redacted.fail(), PipelineState::Failed);
        assert_eq!(PipelineState::Failed.advance(), PipelineState::Failed);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ProcessingConfig::default();
        config.redaction.worker_threads = Some(0);
        let result = Pipeline::new(config, Arc::new(never));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_extraction_failure_is_reported() {
        let pipeline = Pipeline::new(ProcessingConfig::default(), Arc::new(never)).unwrap();
        let err = pipeline.process("doc", b"not a pdf").unwrap_err();
        assert_eq!(err.kind(), "extraction");
        assert_eq!(pipeline.metrics().get_counter("failures.extraction"), 1);
        assert_eq!(pipeline.metrics().get_counter("documents_processed"), 0);
    }

    #[test]
    fn test_process_async_propagates_errors() {
        let pipeline = Pipeline::new(ProcessingConfig::default(), Arc::new(never)).unwrap();
        let result = tokio_test::block_on(pipeline.process_async("doc", b"junk".to_vec()));
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[test]
    fn test_pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Pipeline>();
    }
}
