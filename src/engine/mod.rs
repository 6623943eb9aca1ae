//! Transformation engine
//!
//! Two pure, single-pass stages over the same materialized batch:
//!
//! - **Bucketizer**: hour-aligned location buckets for the relational store
//! - **Resampler**: timestamp-merged sensor table for blob export
//!
//! Neither stage depends on the other's output. `run` executes both, either
//! concurrently on the rayon pool or one after the other.

pub mod bucketizer;
pub mod resampler;

pub use bucketizer::{bucketize, hour_floor_ms, HOUR_MS};
pub use resampler::{resample, sample_offsets, CAPTURE_WINDOW_MS};

use crate::types::{LocationBucket, RawRecord, SampleTable};

/// Outputs of both stages for one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutputs {
    pub buckets: Vec<LocationBucket>,
    pub table: SampleTable,
}

/// Run both stages over one batch.
pub fn run(records: &[RawRecord], parallel: bool) -> StageOutputs {
    let (buckets, table) = if parallel {
        rayon::join(|| bucketize(records), || resample(records))
    } else {
        (bucketize(records), resample(records))
    };
    StageOutputs { buckets, table }
}
