//! telemetry-etl: batch telemetry transformation
//!
//! Turns a batch of raw telemetry records into hourly location buckets and a
//! resampled, wide-format sensor table.
//!
//! ## Architecture
//!
//! - **Engine**: pure bucketizer and waveform resampler
//! - **Export**: delimited-text rendering and zstd compression
//! - **Source**: paginated batch reads (sled, in-memory)
//! - **Sink**: bucket store (PostgreSQL, in-memory) and table store
//!   (object directory, HTTP object store, in-memory)
//! - **Pipeline**: batch service and controller

pub mod config;
pub mod engine;
pub mod export;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, EtlConfig};

// Re-export domain types
pub use types::{
    BatchSummary, LocationBucket, LocationPoint, RawRecord, SampleRow, SampleTable, SensorPayload,
};

// Re-export engine entry points
pub use engine::{bucketize, resample, StageOutputs};

// Re-export collaborators
pub use sink::{AggregateSink, PublishReceipt, SinkError, TableSink};
pub use source::{RecordSource, SourceError};

// Re-export orchestration
pub use pipeline::{BatchController, EtlService, PipelineError};
