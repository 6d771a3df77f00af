//! De-identification report for one processed document

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::redaction::RedactionStats;

/// Wall-clock time spent per pipeline stage, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDurations {
    pub extraction_ms: u64,
    pub redaction_ms: u64,
    pub composition_ms: u64,
    pub total_ms: u64,
}

impl StageDurations {
    pub fn millis(elapsed: Duration) -> u64 {
        elapsed.as_millis() as u64
    }
}

/// Record of a successful de-identification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionReport {
    /// Fresh identifier for this de-identified record
    pub record_id: Uuid,
    /// Caller-supplied correlation id of the source document
    pub document_id: String,
    pub deidentified_at: DateTime<Utc>,
    pub classifier: String,
    pub source_pages: usize,
    pub output_pages: usize,
    pub redaction: RedactionStats,
    pub output_bytes: usize,
    pub durations: StageDurations,
}

impl RedactionReport {
    pub fn new(document_id: impl Into<String>, classifier: impl Into<String>) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            document_id: document_id.into(),
            deidentified_at: Utc::now(),
            classifier: classifier.into(),
            source_pages: 0,
            output_pages: 0,
            redaction: RedactionStats::default(),
            output_bytes: 0,
            durations: StageDurations::default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
