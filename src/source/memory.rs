//! In-memory record source for tests and dry runs

use super::{RecordSource, SourceError};
use crate::types::RawRecord;
use async_trait::async_trait;

/// Holds records in memory and serves them by batch id.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: Vec<RawRecord>,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn fetch_all(&self, batch_id: &str) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.batch_id == batch_id)
            .cloned()
            .collect())
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}
