//! At-rest compression of rotated files

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tidelog_core::{Error, Result, COMPRESSED_SUFFIX};

/// Whole-file byte transform applied to rotated files.
///
/// `decompress(compress(x)) == x` must hold for every input, empty included.
pub trait CompressionCodec: Send + Sync {
    /// File name suffix (without the dot) marking encoded files
    fn suffix(&self) -> &'static str;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Gzip via flate2
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl CompressionCodec for GzipCodec {
    fn suffix(&self) -> &'static str {
        COMPRESSED_SUFFIX
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4 + 32), self.level);
        encoder
            .write_all(data)
            .map_err(|e| Error::compression(format!("gzip encode failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| Error::compression(format!("gzip finish failed: {}", e)))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::with_capacity(data.len() * 4);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::compression(format!("gzip decode failed: {}", e)))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_round_trip_empty() {
        let codec = GzipCodec::default();
        let packed = codec.compress(b"").unwrap();
        assert!(!packed.is_empty());
        assert_eq!(codec.decompress(&packed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_compresses_repetitive_logs() {
        let codec = GzipCodec::new(9);
        let data = "{\"level\":\"info\",\"message\":\"tick\"}\n".repeat(500);
        let packed = codec.compress(data.as_bytes()).unwrap();
        assert!(packed.len() < data.len() / 10);
        assert_eq!(codec.decompress(&packed).unwrap(), data.as_bytes());
    }

    #[test]
    fn test_decompress_garbage_fails() {
        let codec = GzipCodec::default();
        let result = codec.decompress(b"definitely not gzip");
        assert!(matches!(result, Err(Error::CompressionError(_))));
    }

    #[test]
    fn test_suffix() {
        assert_eq!(GzipCodec::default().suffix(), "gz");
    }

    proptest! {
        #[test]
        fn prop_round_trip(data in prop::collection::vec(any::<u8>(), 0..2048), level in 0u32..=9) {
            let codec = GzipCodec::new(level);
            let packed = codec.compress(&data).unwrap();
            prop_assert_eq!(codec.decompress(&packed).unwrap(), data);
        }
    }
}
