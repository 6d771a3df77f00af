//! Re-rendering of text spans onto new pages

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info, instrument};

use super::compression::content_stream;
use super::font_registry::FontRegistry;
use crate::config::CompositionConfig;
use crate::error::CompositionError;
use crate::extractor::fonts::win_ansi_byte;
use crate::types::{flip_y, TextSpan};

/// Stand-in byte for characters WinAnsiEncoding cannot represent
const UNENCODABLE: u8 = b'?';

/// Builds a new document that draws each span at its original position
#[derive(Debug, Clone)]
pub struct PageComposer {
    config: CompositionConfig,
    fonts: FontRegistry,
}

/// Resource names handed out per standard font, in first-use order
#[derive(Debug, Default)]
struct FontResources {
    keys: HashMap<String, String>,
}

impl FontResources {
    fn key_for(&mut self, base_font: &str) -> String {
        let next = self.keys.len() + 1;
        self.keys
            .entry(base_font.to_string())
            .or_insert_with(|| format!("F{}", next))
            .clone()
    }

    fn into_dictionary(self, doc: &mut Document) -> Dictionary {
        let mut fonts = Dictionary::new();
        let mut entries: Vec<(String, String)> = self.keys.into_iter().collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        for (base_font, key) in entries {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => Object::Name(base_font.into_bytes()),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(key, font_id);
        }
        fonts
    }
}

impl PageComposer {
    pub fn new(config: CompositionConfig) -> Self {
        let fonts = FontRegistry::new(&config);
        Self { config, fonts }
    }

    /// Renders spans in order, starting a new page whenever `page_index` changes.
    ///
    /// Fonts and colors never fail: unknown fonts degrade to the default font.
    /// Errors only come from encoding or serializing the output.
    #[instrument(skip_all, fields(spans = spans.len()))]
    pub fn compose(&self, spans: &[TextSpan]) -> Result<Vec<u8>, CompositionError> {
        let (width, height) = self.config.page_size.dimensions();
        let mut fonts = FontResources::default();

        let mut pages: Vec<Vec<Operation>> = vec![Vec::new()];
        let mut current_index = spans.first().map(|s| s.page_index);
        for span in spans {
            if current_index != Some(span.page_index) {
                pages.push(Vec::new());
                current_index = Some(span.page_index);
            }
            let base_font = self.fonts.select(&span.font_name);
            let key = fonts.key_for(base_font);
            if let Some(ops) = pages.last_mut() {
                ops.extend(span_operations(span, &key, height));
            }
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(pages.len());
        for (number, operations) in pages.into_iter().enumerate() {
            let page_id = self.add_page(&mut doc, pages_id, number as u32, operations)?;
            kids.push(Object::Reference(page_id));
        }
        let page_count = kids.len() as i64;

        let font_dict = fonts.into_dictionary(&mut doc);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(width.into()), Object::Real(height.into())],
                "Resources" => dictionary! { "Font" => font_dict },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| CompositionError::Serialize(e.to_string()))?;

        info!(pages = page_count, bytes = bytes.len(), "Composed document");
        Ok(bytes)
    }

    fn add_page(
        &self,
        doc: &mut Document,
        pages_id: ObjectId,
        number: u32,
        operations: Vec<Operation>,
    ) -> Result<ObjectId, CompositionError> {
        let encoded = Content { operations }
            .encode()
            .map_err(|e| CompositionError::Encode { page: number, reason: e.to_string() })?;
        debug!(page = number, content_bytes = encoded.len(), "Page content encoded");

        let stream = content_stream(encoded, self.config.compress_streams)?;
        let content_id = doc.add_object(stream);
        Ok(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        }))
    }
}

impl Default for PageComposer {
    fn default() -> Self {
        Self::new(CompositionConfig::default())
    }
}

fn span_operations(span: &TextSpan, font_key: &str, page_height: f32) -> Vec<Operation> {
    let [r, g, b] = span.color.components();
    let y = flip_y(page_height, span.bbox.y0);
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font_key.as_bytes().to_vec()), real(span.font_size)]),
        Operation::new("rg", vec![real(r), real(g), real(b)]),
        Operation::new(
            "Tm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), real(span.bbox.x0), real(y)],
        ),
        Operation::new("Tj", vec![Object::String(encode_win_ansi(&span.text), StringFormat::Literal)]),
        Operation::new("ET", vec![]),
    ]
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// Encodes text for a WinAnsiEncoding simple font
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_byte(c).unwrap_or(UNENCODABLE))
        .collect()
}
