use thiserror::Error;

/// Refuse to inflate anything larger than this; a corrupted size prefix must not
/// turn into a multi-gigabyte allocation.
const MAX_DECOMPRESSED_LEN: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompressionError {
    #[error("{compressor} failed to compress payload: {message}")]
    Compress {
        compressor: &'static str,
        message: String,
    },
    #[error("{compressor} failed to decompress payload: {message}")]
    Decompress {
        compressor: &'static str,
        message: String,
    },
}

/// Reversible byte transform applied after checksumming on save.
pub trait Compressor {
    fn name(&self) -> &'static str;
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError>;
    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// LZ4 block compression with a little-endian `u32` uncompressed-size prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
        if bytes.len() > MAX_DECOMPRESSED_LEN {
            return Err(CompressionError::Compress {
                compressor: self.name(),
                message: format!(
                    "payload of {} bytes exceeds limit of {MAX_DECOMPRESSED_LEN}",
                    bytes.len()
                ),
            });
        }
        Ok(lz4_flex::compress_prepend_size(bytes))
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let decompress_error = |message: String| CompressionError::Decompress {
            compressor: self.name(),
            message,
        };
        let (prefix, body) = bytes
            .split_first_chunk::<4>()
            .ok_or_else(|| decompress_error("missing size prefix".to_string()))?;
        let expected_len = u32::from_le_bytes(*prefix) as usize;
        if expected_len > MAX_DECOMPRESSED_LEN {
            return Err(decompress_error(format!(
                "declared size {expected_len} exceeds limit of {MAX_DECOMPRESSED_LEN}"
            )));
        }
        let out = lz4_flex::decompress(body, expected_len)
            .map_err(|error| decompress_error(error.to_string()))?;
        if out.len() != expected_len {
            return Err(decompress_error(format!(
                "declared size {expected_len} but produced {} bytes",
                out.len()
            )));
        }
        Ok(out)
    }
}
