//! Record source abstraction for batch retrieval.
//!
//! A source returns the complete, unordered set of records for a batch before
//! the engine runs. Pagination is internal to each implementation. Errors are
//! fatal to the batch and are passed through to the caller unchanged.

mod memory;
mod sled_store;

pub use memory::MemoryRecordSource;
pub use sled_store::{ImportReport, SledRecordStore, DEFAULT_PAGE_SIZE};

use crate::types::RawRecord;
use async_trait::async_trait;

/// Trait abstracting where batch records come from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch every record of `batch_id`.
    async fn fetch_all(&self, batch_id: &str) -> Result<Vec<RawRecord>, SourceError>;

    /// Human-readable name for logging (e.g. "sled", "memory").
    fn source_name(&self) -> &str;
}

/// Record source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("record store error: {0}")]
    Store(#[from] sled::Error),
    #[error("corrupt record at key {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}
