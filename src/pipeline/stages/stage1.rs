//! Stage 1: Field Redaction
//!
//! Splits field lines, classifies every value token and replaces PII with the
//! redaction marker. Spans may be spread over a bounded rayon pool; output
//! order always matches input order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, instrument};

use crate::config::RedactionConfig;
use crate::error::{ClassificationError, Error, Result};
use crate::redaction::{PiiClassifier, RedactionStats, Redactor};
use crate::types::TextSpan;

#[derive(Debug, Clone)]
pub struct Stage1Result {
    pub spans: Vec<TextSpan>,
    pub stats: RedactionStats,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct Stage1Processor {
    redactor: Redactor,
    pool: Option<Arc<ThreadPool>>,
}

impl Stage1Processor {
    pub fn new(config: &RedactionConfig) -> Result<Self> {
        let pool = if config.parallel {
            let threads = config.worker_threads.unwrap_or_else(num_cpus::get);
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("pdx-redact-{}", i))
                .build()
                .map_err(|e| Error::Concurrency(format!("Failed to build redaction pool: {}", e)))?;
            debug!(threads, "Redaction pool ready");
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(Self {
            redactor: Redactor::new(),
            pool,
        })
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    #[instrument(name = "stage1_redaction", skip_all, fields(spans = spans.len()))]
    pub fn execute(
        &self,
        spans: &[TextSpan],
        classifier: &dyn PiiClassifier,
    ) -> std::result::Result<Stage1Result, ClassificationError> {
        let started = Instant::now();
        let (spans, stats) = self
            .redactor
            .redact_all(spans, classifier, self.pool.as_deref())?;
        info!(
            fields = stats.fields,
            tokens = stats.tokens_classified,
            redacted = stats.tokens_redacted,
            "Stage 1: redaction complete"
        );
        Ok(Stage1Result {
            spans,
            stats,
            elapsed: started.elapsed(),
        })
    }
}
