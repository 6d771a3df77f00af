//! Stream filters
//!
//! Undoes the encodings a content stream may carry before it reaches the
//! interpreter. Filters are applied in the order the `/Filter` entry lists
//! them. Anything outside the supported set is an error rather than a raw
//! pass-through, so a page is never interpreted from encoded bytes.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::{Document, Object, Stream};
use thiserror::Error;

use super::{number, resolve};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Unsupported stream filter /{0}")]
    Unsupported(String),

    #[error("Unsupported decode parameters: Predictor {0}")]
    Predictor(i64),

    #[error("{filter} data is corrupt: {reason}")]
    Corrupt { filter: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFilter {
    Flate,
    AsciiHex,
    Ascii85,
}

impl StreamFilter {
    /// Maps a filter name, full or abbreviated, to a supported filter
    pub fn from_name(name: &[u8]) -> Result<Self, FilterError> {
        match name {
            b"FlateDecode" | b"Fl" => Ok(StreamFilter::Flate),
            b"ASCIIHexDecode" | b"AHx" => Ok(StreamFilter::AsciiHex),
            b"ASCII85Decode" | b"A85" => Ok(StreamFilter::Ascii85),
            other => Err(FilterError::Unsupported(String::from_utf8_lossy(other).into_owned())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StreamFilter::Flate => "FlateDecode",
            StreamFilter::AsciiHex => "ASCIIHexDecode",
            StreamFilter::Ascii85 => "ASCII85Decode",
        }
    }

    pub fn decode(self, input: &[u8]) -> Result<Vec<u8>, FilterError> {
        match self {
            StreamFilter::Flate => flate(input),
            StreamFilter::AsciiHex => ascii_hex(input),
            StreamFilter::Ascii85 => ascii85(input),
        }
    }

    fn corrupt(self, reason: impl Into<String>) -> FilterError {
        FilterError::Corrupt {
            filter: self.name(),
            reason: reason.into(),
        }
    }
}

/// Filter chain of a stream, in application order
pub fn stream_filters(doc: &Document, stream: &Stream) -> Result<Vec<StreamFilter>, FilterError> {
    let filters = match stream.dict.get(b"Filter").ok().map(|o| resolve(doc, o)) {
        None | Some(Object::Null) => return Ok(Vec::new()),
        Some(Object::Name(name)) => vec![StreamFilter::from_name(name)?],
        Some(Object::Array(names)) => names
            .iter()
            .map(|o| match resolve(doc, o) {
                Object::Name(name) => StreamFilter::from_name(name),
                other => Err(FilterError::Unsupported(format!("{:?}", other))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(FilterError::Unsupported(format!("{:?}", other))),
    };

    if let Some(predictor) = predictor(doc, stream) {
        return Err(FilterError::Predictor(predictor));
    }
    Ok(filters)
}

/// Stream payload with every filter undone
pub fn decode_stream(doc: &Document, stream: &Stream) -> Result<Vec<u8>, FilterError> {
    let filters = stream_filters(doc, stream)?;
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }
    filters
        .into_iter()
        .try_fold(stream.content.clone(), |data, filter| filter.decode(&data))
}

/// First `/Predictor` above 1 in the decode parameters
fn predictor(doc: &Document, stream: &Stream) -> Option<i64> {
    let params = stream.dict.get(b"DecodeParms").ok().map(|o| resolve(doc, o))?;
    let dicts: Vec<&Object> = match params {
        Object::Array(items) => items.iter().map(|o| resolve(doc, o)).collect(),
        other => vec![other],
    };
    dicts
        .into_iter()
        .filter_map(|o| o.as_dict().ok())
        .filter_map(|d| d.get(b"Predictor").ok().and_then(number))
        .map(|p| p as i64)
        .find(|p| *p > 1)
}

fn flate(input: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::new();
    ZlibDecoder::new(input)
        .read_to_end(&mut out)
        .map_err(|e| StreamFilter::Flate.corrupt(e.to_string()))?;
    Ok(out)
}

fn ascii_hex(input: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::with_capacity(input.len() / 2);
    let mut high: Option<u8> = None;

    for &byte in input {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let digit = (byte as char)
            .to_digit(16)
            .ok_or_else(|| StreamFilter::AsciiHex.corrupt(format!("invalid digit 0x{:02X}", byte)))?
            as u8;
        match high.take() {
            Some(h) => out.push(h << 4 | digit),
            None => high = Some(digit),
        }
    }
    // odd digit count: the last digit is followed by an implied 0
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

fn ascii85(input: &[u8]) -> Result<Vec<u8>, FilterError> {
    let data = input.strip_prefix(b"<~").unwrap_or(input);
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut len = 0;

    for &byte in data {
        match byte {
            b'~' => break,
            b if b.is_ascii_whitespace() => continue,
            b'z' if len == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[len] = byte - b'!';
                len += 1;
                if len == 5 {
                    out.extend_from_slice(&group_value(&group)?.to_be_bytes());
                    len = 0;
                }
            }
            other => {
                return Err(StreamFilter::Ascii85.corrupt(format!("invalid character 0x{:02X}", other)))
            }
        }
    }

    match len {
        0 => {}
        1 => return Err(StreamFilter::Ascii85.corrupt("truncated final group")),
        _ => {
            for digit in group[len..].iter_mut() {
                *digit = b'u' - b'!';
            }
            let bytes = group_value(&group)?.to_be_bytes();
            out.extend_from_slice(&bytes[..len - 1]);
        }
    }
    Ok(out)
}

fn group_value(group: &[u8; 5]) -> Result<u32, FilterError> {
    group
        .iter()
        .try_fold(0u32, |acc, &d| acc.checked_mul(85)?.checked_add(d as u32))
        .ok_or_else(|| StreamFilter::Ascii85.corrupt("group out of range"))
}
