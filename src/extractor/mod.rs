//! Span extraction: PDF bytes to positioned, styled text spans

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::types::{sort_spans, TextSpan};

pub mod filters;
pub mod fonts;
pub mod interpreter;
pub mod runs;

pub use interpreter::{PageInterpreter, PlacedGlyph, TextRun};
pub use runs::{merge_runs, run_to_span, PageBox};

/// Depth limit when walking `/Parent` links for inherited page attributes
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Spans of one document together with its page count
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub page_count: usize,
    pub spans: Vec<TextSpan>,
}

/// Parses documents into reading-ordered text spans
#[derive(Debug, Clone, Default)]
pub struct SpanExtractor {
    config: ExtractionConfig,
}

impl SpanExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extracts every visible text span of the document.
    ///
    /// Fails if the bytes are not a readable PDF or any page content cannot be
    /// decoded; no partial span list is ever returned.
    pub fn extract(&self, document_bytes: &[u8]) -> Result<Vec<TextSpan>, ExtractionError> {
        self.extract_document(document_bytes).map(|extraction| extraction.spans)
    }

    /// Like [`extract`](Self::extract), also reporting the source page count
    #[instrument(skip(self, document_bytes), fields(size = document_bytes.len()))]
    pub fn extract_document(&self, document_bytes: &[u8]) -> Result<Extraction, ExtractionError> {
        let doc = Document::load_mem(document_bytes)
            .map_err(|e| ExtractionError::Open(e.to_string()))?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(ExtractionError::NoPages);
        }

        let mut spans = Vec::new();
        for (page_index, (page_number, page_id)) in pages.iter().enumerate() {
            let page_spans = self.extract_page(&doc, page_index as u32, *page_number, *page_id)?;
            debug!(page = page_number, spans = page_spans.len(), "Page extracted");
            spans.extend(page_spans);
        }

        sort_spans(&mut spans);
        info!(pages = pages.len(), spans = spans.len(), "Extracted text spans");
        Ok(Extraction { page_count: pages.len(), spans })
    }

    fn extract_page(
        &self,
        doc: &Document,
        page_index: u32,
        page_number: u32,
        page_id: ObjectId,
    ) -> Result<Vec<TextSpan>, ExtractionError> {
        let content = page_content(doc, page_number, page_id)?;

        let resources = page_attribute(doc, page_id, b"Resources").and_then(|o| o.as_dict().ok());
        let page_box = page_box(doc, page_id);

        let runs = PageInterpreter::new(doc, page_number, self.config.max_form_depth)
            .run(&content, resources)?;
        let runs = if self.config.merge_runs { merge_runs(runs) } else { runs };

        Ok(runs
            .iter()
            .filter_map(|run| run_to_span(run, page_index, &page_box))
            .collect())
    }
}

/// Follows a reference to the object it points at; other objects pass through
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Decoded payload of a content stream drawn on `page`
pub(crate) fn stream_data(doc: &Document, stream: &Stream, page: u32) -> Result<Vec<u8>, ExtractionError> {
    filters::decode_stream(doc, stream).map_err(|e| ExtractionError::ContentStream {
        page,
        reason: e.to_string(),
    })
}

/// Concatenated, decoded content streams of a page
fn page_content(doc: &Document, page_number: u32, page_id: ObjectId) -> Result<Vec<u8>, ExtractionError> {
    let mut content = Vec::new();
    for stream_id in doc.get_page_contents(page_id) {
        let stream = doc
            .get_object(stream_id)
            .and_then(Object::as_stream)
            .map_err(|e| ExtractionError::PageContent { page: page_number, reason: e.to_string() })?;
        content.extend(stream_data(doc, stream, page_number)?);
        content.push(b'\n');
    }
    Ok(content)
}

/// Looks up a page attribute, honoring inheritance through the page tree
fn page_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current: &Dictionary = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let corners: Option<Vec<f32>> = page_attribute(doc, page_id, b"MediaBox")
        .and_then(|o| o.as_array().ok())
        .map(|arr| arr.iter().filter_map(|o| number(resolve(doc, o))).collect());

    match corners.as_deref() {
        Some([x0, y0, x1, y1]) if (y1 - y0).abs() > 0.0 => PageBox {
            x0: x0.min(*x1),
            y0: y0.min(*y1),
            height: (y1 - y0).abs(),
        },
        _ => PageBox::default(),
    }
}
