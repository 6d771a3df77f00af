//! Content stream compression

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use lopdf::{dictionary, Stream};

use crate::error::CompositionError;

/// Zlib-compresses stream data for the FlateDecode filter
pub fn deflate(data: &[u8]) -> Result<Vec<u8>, CompositionError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CompositionError::Compress(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CompositionError::Compress(e.to_string()))
}

/// Wraps encoded content operators in a stream, compressed when asked
pub fn content_stream(data: Vec<u8>, compress: bool) -> Result<Stream, CompositionError> {
    if !compress {
        return Ok(Stream::new(dictionary! {}, data));
    }
    let compressed = deflate(&data)?;
    Ok(Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    #[test]
    fn test_deflate_is_zlib() {
        let data = b"BT /F1 12 Tf (Name - [REDACTED]) Tj ET".repeat(20);
        let compressed = deflate(&data).unwrap();
        assert!(compressed.len() < data.len());

        let mut out = Vec::new();
        ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_filter_only_when_compressed() {
        let plain = content_stream(b"q Q".to_vec(), false).unwrap();
        assert!(plain.dict.get(b"Filter").is_err());
        assert_eq!(plain.content, b"q Q");

        let packed = content_stream(b"q Q".to_vec(), true).unwrap();
        assert!(packed.dict.get(b"Filter").is_ok());
    }
}
