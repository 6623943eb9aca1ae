//! Sled-backed record store
//!
//! Records are stored as JSON under `"{batch_id}\x1f{record_id}"`, so a batch
//! is one contiguous key range. `fetch_all` walks that range in fixed-size
//! pages, resuming strictly after the last key of the previous page.

use super::{RecordSource, SourceError};
use crate::types::RawRecord;
use async_trait::async_trait;
use std::io::BufRead;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default keys per page
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Separates batch id from record id in a key
const KEY_SEPARATOR: u8 = 0x1f;

/// Outcome of a JSON-lines import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records written
    pub imported: usize,
    /// Lines that were not valid records
    pub rejected: usize,
}

/// Embedded key-value store holding raw batch records
#[derive(Clone)]
pub struct SledRecordStore {
    db: Arc<sled::Db>,
    page_size: usize,
}

impl SledRecordStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self, SourceError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        info!(path = %path_ref.display(), page_size, "Record store opened");
        Ok(Self {
            db: Arc::new(db),
            page_size: page_size.max(1),
        })
    }

    /// Store a record, replacing any record with the same batch and id.
    pub fn insert(&self, record: &RawRecord) -> Result<(), SourceError> {
        let key = record_key(&record.batch_id, &record.id);
        let value = serde_json::to_vec(record).map_err(|e| SourceError::Corrupt {
            key: display_key(&key),
            source: e,
        })?;
        self.db.insert(key, value)?;
        Ok(())
    }

    /// Store many records and flush once.
    pub fn insert_all(&self, records: &[RawRecord]) -> Result<usize, SourceError> {
        for record in records {
            self.insert(record)?;
        }
        self.db.flush()?;
        Ok(records.len())
    }

    /// Import newline-delimited JSON records.
    ///
    /// Blank lines are ignored. Lines that do not parse, or that carry no
    /// `batch_id`, are counted as rejected and logged; they do not abort the
    /// import. Records without an `id` get one from their line number.
    pub fn import_json_lines<R: BufRead>(&self, reader: R) -> Result<ImportReport, SourceError> {
        let mut report = ImportReport::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let line_no = index + 1;

            let mut record = match serde_json::from_str::<RawRecord>(trimmed) {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = line_no, error = %e, "Skipping unparsable record line");
                    report.rejected += 1;
                    continue;
                }
            };
            if record.batch_id.is_empty() {
                warn!(line = line_no, "Skipping record without batch_id");
                report.rejected += 1;
                continue;
            }
            if record.id.is_empty() {
                record.id = format!("line-{line_no:08}");
            }

            self.insert(&record)?;
            report.imported += 1;
        }

        self.db.flush()?;
        info!(
            imported = report.imported,
            rejected = report.rejected,
            "Record import finished"
        );
        Ok(report)
    }

    /// Number of records stored for a batch.
    pub fn count(&self, batch_id: &str) -> usize {
        self.db.scan_prefix(batch_prefix(batch_id)).count()
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), SourceError> {
        self.db.flush()?;
        Ok(())
    }

    /// Read one page of a batch starting after `after` (or at the batch start).
    fn read_page(
        &self,
        prefix: &[u8],
        after: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, RawRecord)>, SourceError> {
        let lower = match after {
            Some(key) => Bound::Excluded(key.to_vec()),
            None => Bound::Included(prefix.to_vec()),
        };

        let mut page = Vec::with_capacity(self.page_size);
        for item in self.db.range::<Vec<u8>, _>((lower, Bound::Unbounded)) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let record = serde_json::from_slice::<RawRecord>(&value).map_err(|e| {
                SourceError::Corrupt {
                    key: display_key(&key),
                    source: e,
                }
            })?;
            page.push((key.to_vec(), record));
            if page.len() >= self.page_size {
                break;
            }
        }
        Ok(page)
    }
}

#[async_trait]
impl RecordSource for SledRecordStore {
    async fn fetch_all(&self, batch_id: &str) -> Result<Vec<RawRecord>, SourceError> {
        let prefix = batch_prefix(batch_id);
        let mut records = Vec::new();
        let mut last_key: Option<Vec<u8>> = None;
        let mut pages = 0usize;

        info!(batch_id, "Fetching batch records");

        loop {
            let page = self.read_page(&prefix, last_key.as_deref())?;
            let full_page = page.len() >= self.page_size;
            if page.is_empty() {
                break;
            }
            pages += 1;
            debug!(batch_id, page = pages, size = page.len(), "Read record page");

            last_key = page.last().map(|(key, _)| key.clone());
            records.extend(page.into_iter().map(|(_, record)| record));

            if !full_page {
                break;
            }
        }

        info!(batch_id, pages, total = records.len(), "Batch fetch finished");
        Ok(records)
    }

    fn source_name(&self) -> &str {
        "sled"
    }
}

fn batch_prefix(batch_id: &str) -> Vec<u8> {
    let mut prefix = batch_id.as_bytes().to_vec();
    prefix.push(KEY_SEPARATOR);
    prefix
}

fn record_key(batch_id: &str, record_id: &str) -> Vec<u8> {
    let mut key = batch_prefix(batch_id);
    key.extend_from_slice(record_id.as_bytes());
    key
}

fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).replace(char::from(KEY_SEPARATOR), "/")
}
