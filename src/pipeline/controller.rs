//! Batch entry point: validates the request and bounds the run.

use super::{EtlService, PipelineError};
use crate::types::BatchSummary;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Front door for batch runs.
#[derive(Clone)]
pub struct BatchController {
    service: EtlService,
    deadline: Option<Duration>,
}

impl BatchController {
    pub fn new(service: EtlService, deadline: Option<Duration>) -> Self {
        Self { service, deadline }
    }

    /// Run one batch. Blank ids are rejected before any I/O. When a deadline
    /// is set, an unfinished run is abandoned with `PipelineError::Timeout`.
    pub async fn handle(&self, batch_id: &str) -> Result<BatchSummary, PipelineError> {
        let batch_id = batch_id.trim();
        if batch_id.is_empty() {
            return Err(PipelineError::MissingBatchId);
        }

        let started = Instant::now();
        info!(batch_id, "Batch started");

        let result = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, self.service.execute(batch_id))
                .await
                .unwrap_or(Err(PipelineError::Timeout(limit))),
            None => self.service.execute(batch_id).await,
        };

        match &result {
            Ok(summary) => info!(
                batch_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                records = summary.records,
                buckets = summary.buckets,
                rows = summary.rows,
                table = summary.table_key.as_deref().unwrap_or("-"),
                "Batch finished"
            ),
            Err(e) => error!(
                batch_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "Batch failed"
            ),
        }
        result
    }
}
