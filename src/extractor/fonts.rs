//! Font resource decoding for text extraction
//!
//! Resolves `/Font` resources into [`FontInfo`] values that turn raw string
//! bytes from the content stream into Unicode text and glyph advances.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use lopdf::{Dictionary, Document, Object};
use regex::bytes::Regex;
use tracing::{debug, warn};

use super::filters::decode_stream;
use super::{number, resolve};
use crate::types::DEFAULT_FONT_NAME;

lazy_static! {
    static ref CMAP_TOKEN: Regex = Regex::new(r"<([0-9A-Fa-f\s]*)>|\[|\]").unwrap();
    static ref BFCHAR_SECTION: Regex = Regex::new(r"(?s)beginbfchar(.*?)endbfchar").unwrap();
    static ref BFRANGE_SECTION: Regex = Regex::new(r"(?s)beginbfrange(.*?)endbfrange").unwrap();
}

/// Windows-1252 code points for bytes 0x80..=0x9F
const WIN_ANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

/// Decodes one WinAnsiEncoding byte
pub fn win_ansi_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WIN_ANSI_HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

/// Encodes one char as a WinAnsiEncoding byte, if representable
pub fn win_ansi_byte(ch: char) -> Option<u8> {
    let code = ch as u32;
    if code < 0x80 || (0xA0..=0xFF).contains(&code) {
        return Some(code as u8);
    }
    WIN_ANSI_HIGH
        .iter()
        .position(|&c| c == ch && c != '\u{FFFD}')
        .map(|i| 0x80 + i as u8)
}

/// One decoded character code
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGlyph {
    pub text: String,
    /// Horizontal advance in glyph space (thousandths of an em)
    pub width: f32,
    /// Single-byte code 32, which receives word spacing
    pub is_word_space: bool,
}

#[derive(Debug, Clone)]
enum Widths {
    Simple { first_char: u32, widths: Vec<f32>, missing: f32 },
    Cid { widths: HashMap<u32, f32>, default: f32 },
}

impl Widths {
    fn width(&self, code: u32) -> f32 {
        match self {
            Widths::Simple { first_char, widths, missing } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize).copied())
                .filter(|w| *w > 0.0)
                .unwrap_or(*missing),
            Widths::Cid { widths, default } => widths.get(&code).copied().unwrap_or(*default),
        }
    }
}

/// Decoding and metrics for one font resource
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// BaseFont with any subset tag removed
    pub base_name: String,
    two_byte: bool,
    to_unicode: Option<HashMap<u32, String>>,
    widths: Widths,
}

impl FontInfo {
    /// Font used when `Tf` names a resource that does not exist
    pub fn fallback() -> Self {
        Self {
            base_name: DEFAULT_FONT_NAME.to_string(),
            two_byte: false,
            to_unicode: None,
            widths: Widths::Simple { first_char: 0, widths: Vec::new(), missing: 500.0 },
        }
    }

    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let base_name = font_base_name(dict);
        let subtype = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .unwrap_or(b"Type1");
        let two_byte = subtype == b"Type0";

        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_stream().ok())
            .and_then(|stream| match decode_stream(doc, stream) {
                Ok(data) => Some(parse_to_unicode(&data)),
                Err(e) => {
                    warn!(font = %base_name, "Ignoring unreadable ToUnicode CMap: {}", e);
                    None
                }
            })
            .filter(|map| !map.is_empty());

        let widths = if two_byte {
            cid_widths(doc, dict)
        } else {
            simple_widths(doc, dict, &base_name)
        };

        Self { base_name, two_byte, to_unicode, widths }
    }

    /// Splits string bytes into character codes and decodes each one
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| {
                    let code = pair.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
                    let text = self.lookup(code).unwrap_or_else(|| {
                        char::from_u32(code)
                            .filter(|c| !c.is_control())
                            .unwrap_or('\u{FFFD}')
                            .to_string()
                    });
                    DecodedGlyph { text, width: self.widths.width(code), is_word_space: false }
                })
                .collect()
        } else {
            bytes
                .iter()
                .map(|&b| {
                    let code = b as u32;
                    let text = self
                        .lookup(code)
                        .unwrap_or_else(|| win_ansi_char(b).to_string());
                    DecodedGlyph { text, width: self.widths.width(code), is_word_space: b == 32 }
                })
                .collect()
        }
    }

    fn lookup(&self, code: u32) -> Option<String> {
        self.to_unicode.as_ref().and_then(|m| m.get(&code).cloned())
    }
}

/// Font resources of one resource dictionary, keyed by resource name
#[derive(Debug, Default)]
pub struct FontCache {
    fonts: HashMap<Vec<u8>, Arc<FontInfo>>,
}

impl FontCache {
    pub fn from_resources(doc: &Document, resources: Option<&Dictionary>) -> Self {
        let mut fonts = HashMap::new();
        let font_dict = resources
            .and_then(|r| r.get(b"Font").ok())
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok());

        if let Some(font_dict) = font_dict {
            for (key, value) in font_dict.iter() {
                if let Ok(dict) = resolve(doc, value).as_dict() {
                    let info = FontInfo::from_dict(doc, dict);
                    debug!("Font resource /{} -> {}", String::from_utf8_lossy(key), info.base_name);
                    fonts.insert(key.clone(), Arc::new(info));
                }
            }
        }

        Self { fonts }
    }

    pub fn get(&self, key: &[u8]) -> Arc<FontInfo> {
        self.fonts
            .get(key)
            .cloned()
            .unwrap_or_else(|| Arc::new(FontInfo::fallback()))
    }
}

fn font_base_name(dict: &Dictionary) -> String {
    let raw = dict
        .get(b"BaseFont")
        .or_else(|_| dict.get(b"Name"))
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_default();

    let name = strip_subset_tag(&raw);
    if name.is_empty() {
        DEFAULT_FONT_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Removes a six-letter subset prefix such as `ABCDEF+`
pub fn strip_subset_tag(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

fn simple_widths(doc: &Document, dict: &Dictionary, base_name: &str) -> Widths {
    let missing = if base_name.starts_with("Courier") { 600.0 } else { 500.0 };
    let first_char = dict
        .get(b"FirstChar")
        .ok()
        .and_then(number)
        .map(|n| n.max(0.0) as u32)
        .unwrap_or(0);
    let widths = dict
        .get(b"Widths")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| arr.iter().map(|w| number(resolve(doc, w)).unwrap_or(0.0)).collect())
        .unwrap_or_default();

    Widths::Simple { first_char, widths, missing }
}

fn cid_widths(doc: &Document, dict: &Dictionary) -> Widths {
    let descendant = dict
        .get(b"DescendantFonts")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .and_then(|arr| arr.first())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok());

    let mut widths = HashMap::new();
    let mut default = 1000.0;

    if let Some(descendant) = descendant {
        if let Some(dw) = descendant.get(b"DW").ok().and_then(number) {
            default = dw;
        }
        let w = descendant
            .get(b"W")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok());
        if let Some(w) = w {
            parse_cid_width_array(doc, w, &mut widths);
        }
    }

    Widths::Cid { widths, default }
}

/// `/W` entries are either `c [w1 w2 ...]` or `c_first c_last w`
fn parse_cid_width_array(doc: &Document, w: &[Object], out: &mut HashMap<u32, f32>) {
    let mut i = 0;
    while i < w.len() {
        let Some(start) = number(resolve(doc, &w[i])) else { break };
        let start = start.max(0.0) as u32;
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    let Some(code) = u32::try_from(offset).ok().and_then(|o| start.checked_add(o)) else {
                        break;
                    };
                    if let Some(width) = number(resolve(doc, width)) {
                        out.insert(code, width);
                    }
                }
                i += 2;
            }
            Some(end) => {
                let (Some(end), Some(width)) = (number(end), w.get(i + 2).and_then(|o| number(resolve(doc, o)))) else {
                    break;
                };
                for code in start..=(end.max(0.0) as u32).min(start.saturating_add(0xFFFF)) {
                    out.insert(code, width);
                }
                i += 3;
            }
            None => break,
        }
    }
}

#[derive(Debug, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
}

fn cmap_tokens(section: &[u8]) -> Vec<CMapToken> {
    CMAP_TOKEN
        .captures_iter(section)
        .map(|cap| match cap.get(1) {
            Some(hex) => CMapToken::Hex(parse_hex(hex.as_bytes())),
            None if &cap[0] == b"[" => CMapToken::ArrayStart,
            None => CMapToken::ArrayEnd,
        })
        .collect()
}

fn parse_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|d| (*d as char).to_digit(16).map(|v| v as u8))
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| if pair.len() == 2 { (pair[0] << 4) | pair[1] } else { pair[0] << 4 })
        .collect()
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| if pair.len() == 2 { u16::from_be_bytes([pair[0], pair[1]]) } else { pair[0] as u16 })
        .collect();
    String::from_utf16_lossy(&units)
}

/// Parses the `bfchar` and `bfrange` sections of a ToUnicode CMap
pub fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let mut map = HashMap::new();

    for section in BFCHAR_SECTION.captures_iter(data) {
        let tokens = cmap_tokens(&section[1]);
        for pair in tokens.chunks(2) {
            if let [CMapToken::Hex(src), CMapToken::Hex(dst)] = pair {
                map.insert(code_value(src), utf16_text(dst));
            }
        }
    }

    for section in BFRANGE_SECTION.captures_iter(data) {
        let tokens = cmap_tokens(&section[1]);
        let mut iter = tokens.into_iter();
        while let (Some(CMapToken::Hex(lo)), Some(CMapToken::Hex(hi))) = (iter.next(), iter.next()) {
            let (lo, hi) = (code_value(&lo), code_value(&hi));
            if hi < lo || hi - lo > 0xFFFF {
                break;
            }
            match iter.next() {
                Some(CMapToken::Hex(dst)) => {
                    let mut units: Vec<u16> = dst
                        .chunks(2)
                        .map(|p| if p.len() == 2 { u16::from_be_bytes([p[0], p[1]]) } else { p[0] as u16 })
                        .collect();
                    for code in lo..=hi {
                        map.insert(code, String::from_utf16_lossy(&units));
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(1);
                        }
                    }
                }
                Some(CMapToken::ArrayStart) => {
                    // None once the code space is exhausted; the array is still consumed
                    let mut code = Some(lo);
                    for token in iter.by_ref() {
                        match token {
                            CMapToken::Hex(dst) => {
                                if let Some(c) = code.filter(|c| *c <= hi) {
                                    map.insert(c, utf16_text(&dst));
                                }
                                code = code.and_then(|c| c.checked_add(1));
                            }
                            _ => break,
                        }
                    }
                }
                _ => break,
            }
        }
    }

    map
}
