//! Classification and redaction of field values

pub mod classifier;
pub mod field_splitter;
pub mod redactor;

pub use classifier::{builtin_rule_names, parse_lexicon, PiiClassifier, RuleClassifier};
pub use field_splitter::{FieldLine, FieldSplitter, FIELD_DELIMITER};
pub use redactor::{RedactedSpan, RedactionStats, Redactor, REDACTION_MARKER};
