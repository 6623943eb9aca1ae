//! Batch service: fetch, transform, persist, export.

use super::PipelineError;
use crate::engine;
use crate::export::table_file_name;
use crate::sink::{AggregateSink, TableSink};
use crate::source::RecordSource;
use crate::types::BatchSummary;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs one batch through both engine stages and hands each output to its
/// sink. Holds no per-batch state, so one service can run many batches.
#[derive(Clone)]
pub struct EtlService {
    source: Arc<dyn RecordSource>,
    bucket_sink: Arc<dyn AggregateSink>,
    table_sink: Arc<dyn TableSink>,
    file_prefix: String,
    parallel_stages: bool,
}

impl EtlService {
    pub fn new(
        source: Arc<dyn RecordSource>,
        bucket_sink: Arc<dyn AggregateSink>,
        table_sink: Arc<dyn TableSink>,
    ) -> Self {
        Self {
            source,
            bucket_sink,
            table_sink,
            file_prefix: "sensors".to_string(),
            parallel_stages: true,
        }
    }

    /// Prefix of exported table names
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Run the two stages concurrently (default) or one after the other
    pub fn with_parallel_stages(mut self, parallel: bool) -> Self {
        self.parallel_stages = parallel;
        self
    }

    /// Process every record of `batch_id`.
    ///
    /// An empty batch returns a zero summary without calling either sink.
    /// Source and sink failures are returned as-is; the batch is aborted at
    /// the first one.
    pub async fn execute(&self, batch_id: &str) -> Result<BatchSummary, PipelineError> {
        let started = Instant::now();
        let mut summary = BatchSummary::empty(batch_id);

        let records = self.source.fetch_all(batch_id).await?;
        summary.records = records.len();
        info!(
            batch_id,
            source = self.source.source_name(),
            records = records.len(),
            "Fetched batch records"
        );

        if records.is_empty() {
            info!(batch_id, "No records for batch, nothing to do");
            summary.elapsed = started.elapsed();
            return Ok(summary);
        }

        let parallel = self.parallel_stages;
        let outputs =
            tokio::task::spawn_blocking(move || engine::run(&records, parallel)).await?;
        debug!(
            batch_id,
            buckets = outputs.buckets.len(),
            rows = outputs.table.len(),
            parallel,
            "Engine stages finished"
        );

        summary.buckets = outputs.buckets.len();
        if outputs.buckets.is_empty() {
            warn!(batch_id, "No positioned records, skipping bucket store");
        } else {
            summary.buckets_inserted = self.bucket_sink.store(&outputs.buckets).await?;
            info!(
                batch_id,
                sink = self.bucket_sink.sink_name(),
                buckets = summary.buckets,
                inserted = summary.buckets_inserted,
                "Stored location buckets"
            );
        }

        let table = outputs.table;
        summary.rows = table.len();
        summary.sensors = table.sensor_ids().len();
        if table.is_empty() {
            info!(batch_id, "No sensor samples, skipping table export");
        } else {
            if let Some((first, last)) = table.time_span() {
                info!(
                    batch_id,
                    rows = table.len(),
                    sensors = summary.sensors,
                    first = %first.to_rfc3339_opts(SecondsFormat::Millis, true),
                    last = %last.to_rfc3339_opts(SecondsFormat::Millis, true),
                    "Sensor table built"
                );
            }
            let name = table_file_name(&self.file_prefix, batch_id, Utc::now().timestamp_millis());
            let receipt = self.table_sink.publish(&name, &table).await?;
            info!(
                batch_id,
                sink = self.table_sink.sink_name(),
                key = %receipt.key,
                raw_bytes = receipt.raw_bytes,
                compressed_bytes = receipt.compressed_bytes,
                "Published sensor table"
            );
            summary.table_key = Some(receipt.key);
        }

        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}
