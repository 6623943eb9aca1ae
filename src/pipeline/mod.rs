//! Batch orchestration
//!
//! ```text
//! BatchController::handle(batch_id)      validate id, apply deadline
//!   └─ EtlService::execute(batch_id)
//!        ├─ RecordSource::fetch_all      complete batch, paginated inside
//!        ├─ engine::run                  blocking worker, stages via rayon::join
//!        ├─ AggregateSink::store         only when buckets exist
//!        └─ TableSink::publish           only when rows exist
//! ```

mod controller;
mod service;

pub use controller::BatchController;
pub use service::EtlService;

use crate::sink::SinkError;
use crate::source::SourceError;
use std::time::Duration;

/// Batch run errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("batch id is required")]
    MissingBatchId,
    #[error("record source failed: {0}")]
    Source(#[from] SourceError),
    #[error("sink failed: {0}")]
    Sink(#[from] SinkError),
    #[error("batch exceeded its {0:?} deadline")]
    Timeout(Duration),
    #[error("engine worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
