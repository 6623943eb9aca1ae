//! In-memory sinks for testing and dry runs
//!
//! Thread-safe via `RwLock`. Not durable: contents are lost with the process.

use super::{sanitize_name, AggregateSink, PublishReceipt, SinkError, TableSink};
use crate::export::{decompress, encode_table, DEFAULT_LEVEL};
use crate::types::{LocationBucket, SampleTable};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Collects buckets, skipping duplicates of `(batch_id, bucket_start)` the
/// way the relational store does.
#[derive(Debug, Default)]
pub struct MemoryBucketSink {
    buckets: RwLock<Vec<LocationBucket>>,
    calls: AtomicUsize,
}

impl MemoryBucketSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored bucket in insertion order
    pub fn stored(&self) -> Vec<LocationBucket> {
        self.buckets.read().map(|b| b.clone()).unwrap_or_default()
    }

    /// Number of `store` calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AggregateSink for MemoryBucketSink {
    async fn store(&self, buckets: &[LocationBucket]) -> Result<u64, SinkError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut stored = self
            .buckets
            .write()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        let mut inserted = 0u64;
        for bucket in buckets {
            let duplicate = stored
                .iter()
                .any(|b| b.batch_id == bucket.batch_id && b.bucket_start == bucket.bucket_start);
            if !duplicate {
                stored.push(bucket.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn sink_name(&self) -> &str {
        "memory"
    }
}

/// Keeps compressed table objects in a map keyed by object name.
#[derive(Debug)]
pub struct MemoryTableSink {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    delimiter: char,
    level: i32,
    calls: AtomicUsize,
}

impl Default for MemoryTableSink {
    fn default() -> Self {
        Self::new(',', DEFAULT_LEVEL)
    }
}

impl MemoryTableSink {
    pub fn new(delimiter: char, level: i32) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            delimiter,
            level,
            calls: AtomicUsize::new(0),
        }
    }

    /// Names of every published object
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .read()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Number of `publish` calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TableSink for MemoryTableSink {
    async fn publish(&self, name: &str, table: &SampleTable) -> Result<PublishReceipt, SinkError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let encoded = encode_table(table, self.delimiter, self.level)?;
        let key = sanitize_name(name);
        let receipt = PublishReceipt {
            key: key.clone(),
            raw_bytes: encoded.raw_bytes,
            compressed_bytes: encoded.body.len(),
        };

        self.objects
            .write()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?
            .insert(key, encoded.body);
        Ok(receipt)
    }

    async fn fetch(&self, name: &str) -> Result<String, SinkError> {
        let key = sanitize_name(name);
        let objects = self
            .objects
            .read()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        let body = objects.get(&key).ok_or(SinkError::NotFound(key.clone()))?;
        Ok(decompress(body)?)
    }

    fn sink_name(&self) -> &str {
        "memory"
    }
}
