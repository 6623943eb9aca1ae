//! Output sinks for the two engine stages
//!
//! - `AggregateSink`: persists location buckets (PostgreSQL, in-memory)
//! - `TableSink`: publishes the compressed sensor table (local object
//!   directory, HTTP object store, in-memory) and fetches it back
//!
//! Sinks own their idempotency: re-running a batch must not duplicate stored
//! buckets. Failures are returned unchanged to the batch service.

mod blob;
mod memory;
mod postgres;

pub use blob::{FsTableSink, HttpTableSink};
pub use memory::{MemoryBucketSink, MemoryTableSink};
pub use postgres::PostgresBucketSink;

use crate::config::{BlobBackend, BlobConfig, ExportConfig};
use crate::export::CompressionError;
use crate::types::{LocationBucket, SampleTable};
use async_trait::async_trait;
use std::sync::Arc;

/// Destination for hourly location buckets.
#[async_trait]
pub trait AggregateSink: Send + Sync {
    /// Persist buckets, skipping ones already stored. Returns rows inserted.
    async fn store(&self, buckets: &[LocationBucket]) -> Result<u64, SinkError>;

    /// Backend name for logging
    fn sink_name(&self) -> &str;
}

/// Destination for exported sensor tables.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Serialize, compress and upload `table` under `name`.
    async fn publish(&self, name: &str, table: &SampleTable) -> Result<PublishReceipt, SinkError>;

    /// Download a published table and return its delimited text.
    async fn fetch(&self, name: &str) -> Result<String, SinkError>;

    /// Backend name for logging
    fn sink_name(&self) -> &str;
}

/// Where a table landed and how large it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Object key (prefix included)
    pub key: String,
    pub raw_bytes: usize,
    pub compressed_bytes: usize,
}

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("object store returned status {0}")]
    ServerStatus(reqwest::StatusCode),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object is empty: {0}")]
    EmptyObject(String),
    #[error("sink misconfigured: {0}")]
    Config(String),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Build the table sink selected by `blob.backend`.
pub fn table_sink_from_config(
    blob: &BlobConfig,
    export: &ExportConfig,
) -> Result<Arc<dyn TableSink>, SinkError> {
    Ok(match blob.backend {
        BlobBackend::Fs => Arc::new(FsTableSink::from_config(blob, export)?),
        BlobBackend::Http => Arc::new(HttpTableSink::from_config(blob, export)?),
    })
}

/// Object-key-safe version of a table name: `[A-Za-z0-9._-]`, other
/// characters replaced with `_`.
pub(crate) fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("sensors_b-1_17.csv"), "sensors_b-1_17.csv");
        assert_eq!(sanitize_name("../../x y.csv"), ".._.._x_y.csv");
    }

    #[test]
    fn test_fs_backend_selected_by_default() {
        let sink = table_sink_from_config(&BlobConfig::default(), &ExportConfig::default()).unwrap();
        assert_eq!(sink.sink_name(), "fs");
    }

    #[test]
    fn test_bad_delimiter_is_config_error() {
        let export = ExportConfig {
            delimiter: "::".to_string(),
            ..ExportConfig::default()
        };
        let result = table_sink_from_config(&BlobConfig::default(), &export);
        assert!(matches!(result, Err(SinkError::Config(_))));
    }
}
