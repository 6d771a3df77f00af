//! Token-level redaction of field values

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::classifier::PiiClassifier;
use super::field_splitter::{FieldSplitter, FIELD_DELIMITER};
use crate::error::ClassificationError;
use crate::types::{ClassificationDecision, TextSpan};

/// Replacement token for anything classified as PII
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Counters for one redaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionStats {
    pub spans: usize,
    pub fields: usize,
    pub tokens_classified: usize,
    pub tokens_redacted: usize,
}

impl RedactionStats {
    fn record(&mut self, decisions: Option<&[ClassificationDecision]>) {
        self.spans += 1;
        if let Some(decisions) = decisions {
            self.fields += 1;
            self.tokens_classified += decisions.len();
            self.tokens_redacted += decisions.iter().filter(|d| d.is_pii).count();
        }
    }
}

/// A span after redaction, with the decisions taken for its value
#[derive(Debug, Clone, PartialEq)]
pub struct RedactedSpan {
    pub span: TextSpan,
    /// `None` when the span is not a field line and was not classified
    pub decisions: Option<Vec<ClassificationDecision>>,
}

/// Applies classifier decisions to span text
#[derive(Debug, Clone, Copy, Default)]
pub struct Redactor {
    splitter: FieldSplitter,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies every whitespace-delimited token of `value`, in order
    pub fn classify_tokens(
        &self,
        value: &str,
        classifier: &dyn PiiClassifier,
    ) -> Result<Vec<ClassificationDecision>, ClassificationError> {
        value
            .split_whitespace()
            .map(|token| {
                let is_pii = classifier.classify(token)?;
                // token text stays out of the logs
                trace!(token_len = token.len(), is_pii, "Token classified");
                Ok(ClassificationDecision { token: token.to_string(), is_pii })
            })
            .collect()
    }

    /// Rebuilds a value from decisions, joining tokens with single spaces
    pub fn apply(decisions: &[ClassificationDecision]) -> String {
        decisions
            .iter()
            .map(|d| if d.is_pii { REDACTION_MARKER } else { d.token.as_str() })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Redacts a free value string
    pub fn redact(&self, value: &str, classifier: &dyn PiiClassifier) -> Result<String, ClassificationError> {
        Ok(Self::apply(&self.classify_tokens(value, classifier)?))
    }

    /// Redacts the value part of a field line; other spans come back unchanged
    pub fn redact_span(
        &self,
        span: &TextSpan,
        classifier: &dyn PiiClassifier,
    ) -> Result<RedactedSpan, ClassificationError> {
        match self.splitter.split(&span.text) {
            Some(field) => {
                let decisions = self.classify_tokens(field.value, classifier)?;
                let text = format!("{}{}{}", field.label, FIELD_DELIMITER, Self::apply(&decisions));
                Ok(RedactedSpan { span: span.with_text(text), decisions: Some(decisions) })
            }
            None => Ok(RedactedSpan { span: span.clone(), decisions: None }),
        }
    }

    /// Redacts a whole span sequence, preserving its order.
    ///
    /// With a pool, spans are classified concurrently; the first error aborts
    /// the pass and no redacted spans are returned.
    pub fn redact_all(
        &self,
        spans: &[TextSpan],
        classifier: &dyn PiiClassifier,
        pool: Option<&ThreadPool>,
    ) -> Result<(Vec<TextSpan>, RedactionStats), ClassificationError> {
        let redacted: Vec<RedactedSpan> = match pool {
            Some(pool) => pool.install(|| {
                spans
                    .par_iter()
                    .map(|span| self.redact_span(span, classifier))
                    .collect::<Result<Vec<_>, _>>()
            })?,
            None => spans
                .iter()
                .map(|span| self.redact_span(span, classifier))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let mut stats = RedactionStats::default();
        let spans = redacted
            .into_iter()
            .map(|r| {
                stats.record(r.decisions.as_deref());
                r.span
            })
            .collect();
        Ok((spans, stats))
    }
}
