//! zstd framing for exported tables

use std::io::Read;

/// Default zstd level
pub const DEFAULT_LEVEL: i32 = 3;

/// Upper bound on a decompressed table; protects against zip bombs
pub const MAX_DECOMPRESSED_BYTES: u64 = 64 * 1024 * 1024;

/// Compression errors
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("zstd error: {0}")]
    Zstd(#[from] std::io::Error),
    #[error("decompressed object exceeds {MAX_DECOMPRESSED_BYTES} bytes")]
    TooLarge,
    #[error("decompressed object is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Compress delimited text.
pub fn compress(text: &str, level: i32) -> Result<Vec<u8>, CompressionError> {
    Ok(zstd::encode_all(text.as_bytes(), level)?)
}

/// Decompress an exported object back to text.
pub fn decompress(bytes: &[u8]) -> Result<String, CompressionError> {
    let decoder = zstd::stream::read::Decoder::new(bytes)?;
    let mut raw = Vec::new();
    decoder
        .take(MAX_DECOMPRESSED_BYTES + 1)
        .read_to_end(&mut raw)?;
    if raw.len() as u64 > MAX_DECOMPRESSED_BYTES {
        return Err(CompressionError::TooLarge);
    }
    Ok(String::from_utf8(raw)?)
}
