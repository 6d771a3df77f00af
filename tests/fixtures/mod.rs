#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

/// One line of text drawn by a fixture page
#[derive(Debug, Clone)]
pub struct Line {
    pub text: String,
    pub x: f32,
    /// Baseline in PDF space (bottom-left origin)
    pub baseline: f32,
    pub font: &'static str,
    pub size: f32,
    pub rgb: Option<[f32; 3]>,
}

impl Line {
    pub fn new(text: &str, x: f32, baseline: f32) -> Self {
        Self {
            text: text.to_string(),
            x,
            baseline,
            font: "F1",
            size: 12.0,
            rgb: None,
        }
    }

    pub fn font(mut self, key: &'static str, size: f32) -> Self {
        self.font = key;
        self.size = size;
        self
    }

    pub fn rgb(mut self, r: f32, g: f32, b: f32) -> Self {
        self.rgb = Some([r, g, b]);
        self
    }

    fn operations(&self) -> Vec<Operation> {
        let mut ops = vec![Operation::new("BT", vec![])];
        if let Some([r, g, b]) = self.rgb {
            ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
        }
        ops.extend([
            Operation::new("Tf", vec![Object::Name(self.font.as_bytes().to_vec()), real(self.size)]),
            Operation::new("Td", vec![real(self.x), real(self.baseline)]),
            Operation::new("Tj", vec![Object::String(self.text.as_bytes().to_vec(), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
        ops
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

pub struct TestFixtures;

impl TestFixtures {
    /// Fonts available to every fixture page
    pub const FONTS: [(&'static str, &'static str); 3] =
        [("F1", "Helvetica"), ("F2", "Times-Bold"), ("F3", "Courier")];

    /// Builds a Letter-sized document with one entry of `pages` per page
    pub fn pdf(pages: &[Vec<Line>]) -> Vec<u8> {
        let streams = pages
            .iter()
            .map(|lines| {
                let operations: Vec<_> = lines.iter().flat_map(Line::operations).collect();
                Stream::new(dictionary! {}, Content { operations }.encode().unwrap())
            })
            .collect();
        Self::document(streams)
    }

    /// One page whose content stream declares `filter` over `data` as given
    pub fn encoded_page(filter: &str, data: Vec<u8>) -> Vec<u8> {
        Self::document(vec![Stream::new(dictionary! { "Filter" => filter }, data)])
    }

    fn document(contents: Vec<Stream>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = lopdf::Dictionary::new();
        for (key, base) in Self::FONTS {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(key, font_id);
        }
        let resources_id = doc.add_object(dictionary! { "Font" => fonts });

        let mut kids: Vec<Object> = Vec::new();
        for content in contents {
            let content_id = doc.add_object(content);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// A single page of lines stacked 20pt apart from the top margin
    pub fn form(lines: &[&str]) -> Vec<u8> {
        let page = lines
            .iter()
            .enumerate()
            .map(|(i, text)| Line::new(text, 72.0, 720.0 - 20.0 * i as f32))
            .collect::<Vec<_>>();
        Self::pdf(&[page])
    }

    pub fn blank() -> Vec<u8> {
        Self::pdf(&[Vec::new()])
    }

    pub fn texts(spans: &[pdx_deid::TextSpan]) -> Vec<&str> {
        spans.iter().map(|s| s.text.as_str()).collect()
    }
}
