//! Table export codec
//!
//! Turns a `SampleTable` into the compressed delimited-text object handed to
//! blob storage, and back into text when an object is fetched.

pub mod compression;
pub mod delimited;

pub use compression::{compress, decompress, CompressionError, DEFAULT_LEVEL};
pub use delimited::{escape_field, to_delimited};

use crate::types::SampleTable;

/// Rendered and compressed table, ready for transport.
#[derive(Debug, Clone)]
pub struct EncodedTable {
    pub body: Vec<u8>,
    /// Size of the uncompressed delimited text
    pub raw_bytes: usize,
}

/// Render and compress a table.
pub fn encode_table(
    table: &SampleTable,
    delimiter: char,
    level: i32,
) -> Result<EncodedTable, CompressionError> {
    let text = to_delimited(table, delimiter);
    let body = compress(&text, level)?;
    Ok(EncodedTable {
        body,
        raw_bytes: text.len(),
    })
}

/// Object name for a batch's sensor table: `{prefix}_{batch}_{millis}.csv`.
///
/// The batch id is reduced to `[A-Za-z0-9_-]` so it is safe as a file name
/// and object key.
pub fn table_file_name(prefix: &str, batch_id: &str, now_ms: i64) -> String {
    let safe_id: String = batch_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{prefix}_{safe_id}_{now_ms}.csv")
}
