//! Batch run summary

use serde::Serialize;
use std::time::Duration;

/// Outcome of one batch run through the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    /// Records returned by the source
    pub records: usize,
    /// Buckets produced by the bucketizer
    pub buckets: usize,
    /// Rows actually inserted by the aggregate sink (duplicates skipped)
    pub buckets_inserted: u64,
    /// Rows in the exported sensor table
    pub rows: usize,
    /// Distinct sensor columns
    pub sensors: usize,
    /// Object key of the published table, if one was exported
    pub table_key: Option<String>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn empty(batch_id: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            ..Self::default()
        }
    }
}
