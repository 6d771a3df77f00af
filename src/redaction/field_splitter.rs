//! Label/value splitting for structured "field - value" lines

/// Separator between a field label and its value
pub const FIELD_DELIMITER: &str = " - ";

/// A span text split at the first field delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLine<'a> {
    pub label: &'a str,
    pub value: &'a str,
}

/// Splits `"label - value"` on the first delimiter.
///
/// Text without the delimiter is not a field line and is never classified.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSplitter;

impl FieldSplitter {
    pub fn split<'a>(&self, span_text: &'a str) -> Option<FieldLine<'a>> {
        span_text
            .split_once(FIELD_DELIMITER)
            .map(|(label, value)| FieldLine { label, value })
    }
}
