//! Content stream interpreter
//!
//! Replays the subset of the PDF graphics model that affects where text lands:
//! the CTM stack, the text matrices, text state parameters and the fill color.
//! Every text-showing operator produces one [`TextRun`].

use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object};
use tracing::{trace, warn};

use super::fonts::{FontCache, FontInfo};
use super::{number, resolve, stream_data};
use crate::error::ExtractionError;
use crate::types::{Matrix, RgbColor};

/// Extra TJ displacement, in ems, treated as an implicit word space
const TJ_SPACE_THRESHOLD: f32 = 0.2;

/// One glyph placed in user space
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGlyph {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
}

impl PlacedGlyph {
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Glyphs emitted by a single show operator, in user space (bottom-left origin)
#[derive(Debug, Clone)]
pub struct TextRun {
    pub glyphs: Vec<PlacedGlyph>,
    pub baseline: f32,
    pub font_name: String,
    pub font_size: f32,
    pub color: RgbColor,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Arc<FontInfo>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Arc::new(FontInfo::fallback()),
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    fill: RgbColor,
    text: TextState,
}

/// Interprets the content of one page, including nested form XObjects
pub struct PageInterpreter<'a> {
    doc: &'a Document,
    page_number: u32,
    max_form_depth: usize,
    runs: Vec<TextRun>,
}

impl<'a> PageInterpreter<'a> {
    pub fn new(doc: &'a Document, page_number: u32, max_form_depth: usize) -> Self {
        Self {
            doc,
            page_number,
            max_form_depth,
            runs: Vec::new(),
        }
    }

    /// Runs the page content and returns the text runs in content order
    pub fn run(
        mut self,
        content: &[u8],
        resources: Option<&Dictionary>,
    ) -> Result<Vec<TextRun>, ExtractionError> {
        let content = Content::decode(content).map_err(|e| ExtractionError::ContentStream {
            page: self.page_number,
            reason: e.to_string(),
        })?;
        self.execute(&content.operations, resources, GraphicsState::default(), 0)?;
        Ok(self.runs)
    }

    fn execute(
        &mut self,
        operations: &[Operation],
        resources: Option<&Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) -> Result<(), ExtractionError> {
        let fonts = FontCache::from_resources(self.doc, resources);
        let mut gs = initial;
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for op in operations {
            let nums: Vec<f32> = op.operands.iter().filter_map(number).collect();
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if let [a, b, c, d, e, f] = nums[..] {
                        gs.ctm = Matrix::new(a, b, c, d, e, f).multiply(&gs.ctm);
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if let Some(Object::Name(key)) = op.operands.first() {
                        gs.text.font = fonts.get(key);
                    }
                    if let Some(size) = op.operands.get(1).and_then(number) {
                        gs.text.size = size;
                    }
                }
                "Tc" => set_first(&nums, &mut gs.text.char_spacing),
                "Tw" => set_first(&nums, &mut gs.text.word_spacing),
                "Tz" => {
                    if let Some(scale) = nums.first() {
                        gs.text.horizontal_scale = scale / 100.0;
                    }
                }
                "TL" => set_first(&nums, &mut gs.text.leading),
                "Ts" => set_first(&nums, &mut gs.text.rise),
                "Td" => {
                    if let [tx, ty] = nums[..] {
                        tlm = Matrix::translation(tx, ty).multiply(&tlm);
                        tm = tlm;
                    }
                }
                "TD" => {
                    if let [tx, ty] = nums[..] {
                        gs.text.leading = -ty;
                        tlm = Matrix::translation(tx, ty).multiply(&tlm);
                        tm = tlm;
                    }
                }
                "Tm" => {
                    if let [a, b, c, d, e, f] = nums[..] {
                        tlm = Matrix::new(a, b, c, d, e, f);
                        tm = tlm;
                    }
                }
                "T*" => {
                    tlm = Matrix::translation(0.0, -gs.text.leading).multiply(&tlm);
                    tm = tlm;
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        let mut glyphs = Vec::new();
                        self.show_string(bytes, &gs, &mut tm, &mut glyphs);
                        self.push_run(glyphs, &gs, &tm);
                    }
                }
                "'" | "\"" => {
                    if op.operator == "\"" {
                        if let [aw, ac, ..] = nums[..] {
                            gs.text.word_spacing = aw;
                            gs.text.char_spacing = ac;
                        }
                    }
                    tlm = Matrix::translation(0.0, -gs.text.leading).multiply(&tlm);
                    tm = tlm;
                    if let Some(Object::String(bytes, _)) = op.operands.last() {
                        let mut glyphs = Vec::new();
                        self.show_string(bytes, &gs, &mut tm, &mut glyphs);
                        self.push_run(glyphs, &gs, &tm);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        let start = tm;
                        let mut glyphs = Vec::new();
                        for item in items {
                            match item {
                                Object::String(bytes, _) => {
                                    self.show_string(bytes, &gs, &mut tm, &mut glyphs)
                                }
                                other => {
                                    if let Some(adjust) = number(other) {
                                        self.adjust(adjust, &gs, &mut tm, &mut glyphs);
                                    }
                                }
                            }
                        }
                        self.push_run(glyphs, &gs, &start);
                    }
                }
                "g" | "rg" | "k" | "sc" | "scn" => set_fill(&nums, &mut gs.fill),
                "cs" => gs.fill = RgbColor::BLACK,
                "Do" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        self.draw_form(name, resources, &gs, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn show_string(&self, bytes: &[u8], gs: &GraphicsState, tm: &mut Matrix, out: &mut Vec<PlacedGlyph>) {
        let text = &gs.text;
        for glyph in text.font.decode(bytes) {
            let trm = self.rendering_matrix(gs, tm);
            let scale_x = (trm.a * trm.a + trm.b * trm.b).sqrt();
            let w0 = glyph.width / 1000.0;
            let x0 = trm.e;
            let x1 = x0 + w0 * scale_x;

            let mut tx = w0 * text.size + text.char_spacing;
            if glyph.is_word_space {
                tx += text.word_spacing;
            }
            *tm = Matrix::translation(tx * text.horizontal_scale, 0.0).multiply(tm);

            out.push(PlacedGlyph { text: glyph.text, x0, x1 });
        }
    }

    fn adjust(&self, adjust: f32, gs: &GraphicsState, tm: &mut Matrix, out: &mut Vec<PlacedGlyph>) {
        let text = &gs.text;
        let displacement = -adjust / 1000.0;
        if displacement > TJ_SPACE_THRESHOLD && out.last().map_or(false, |g| !g.is_blank()) {
            let x = self.rendering_matrix(gs, tm).e;
            out.push(PlacedGlyph { text: " ".into(), x0: x, x1: x });
        }
        *tm = Matrix::translation(displacement * text.size * text.horizontal_scale, 0.0).multiply(tm);
    }

    fn rendering_matrix(&self, gs: &GraphicsState, tm: &Matrix) -> Matrix {
        let text = &gs.text;
        Matrix::new(text.size * text.horizontal_scale, 0.0, 0.0, text.size, 0.0, text.rise)
            .multiply(tm)
            .multiply(&gs.ctm)
    }

    fn push_run(&mut self, glyphs: Vec<PlacedGlyph>, gs: &GraphicsState, tm: &Matrix) {
        if glyphs.is_empty() {
            return;
        }
        let trm = self.rendering_matrix(gs, tm);
        let font_size = gs.text.size.abs() * tm.multiply(&gs.ctm).vertical_scale();
        trace!(page = self.page_number, font = %gs.text.font.base_name, font_size, "text run");

        self.runs.push(TextRun {
            glyphs,
            baseline: trm.f,
            font_name: gs.text.font.base_name.clone(),
            font_size,
            color: gs.fill,
        });
    }

    /// Draws a form XObject; images and unknown names are skipped, unreadable forms fail the page
    fn draw_form(
        &mut self,
        name: &[u8],
        resources: Option<&Dictionary>,
        gs: &GraphicsState,
        depth: usize,
    ) -> Result<(), ExtractionError> {
        if depth >= self.max_form_depth {
            warn!(page = self.page_number, depth, "Form XObject nesting limit reached, skipping");
            return Ok(());
        }

        let stream = resources
            .and_then(|r| r.get(b"XObject").ok())
            .map(|o| resolve(self.doc, o))
            .and_then(|o| o.as_dict().ok())
            .and_then(|x| x.get(name).ok())
            .map(|o| resolve(self.doc, o))
            .and_then(|o| o.as_stream().ok());
        let Some(stream) = stream else { return Ok(()) };

        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map_or(false, |s| s == b"Form");
        if !is_form {
            return Ok(());
        }

        let data = stream_data(self.doc, stream, self.page_number)?;
        let content = Content::decode(&data).map_err(|e| ExtractionError::ContentStream {
            page: self.page_number,
            reason: format!("form XObject /{}: {}", String::from_utf8_lossy(name), e),
        })?;

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .map(|o| resolve(self.doc, o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| arr.iter().filter_map(number).collect::<Vec<f32>>())
            .and_then(|m| match m[..] {
                [a, b, c, d, e, f] => Some(Matrix::new(a, b, c, d, e, f)),
                _ => None,
            })
            .unwrap_or(Matrix::IDENTITY);

        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .map(|o| resolve(self.doc, o))
            .and_then(|o| o.as_dict().ok())
            .or(resources);

        let mut form_state = gs.clone();
        form_state.ctm = matrix.multiply(&gs.ctm);
        self.execute(&content.operations, form_resources, form_state, depth + 1)
    }
}

fn set_first(nums: &[f32], target: &mut f32) {
    if let Some(v) = nums.first() {
        *target = *v;
    }
}

fn set_fill(nums: &[f32], fill: &mut RgbColor) {
    if let Some(color) = RgbColor::from_components(nums) {
        *fill = color;
    }
}
