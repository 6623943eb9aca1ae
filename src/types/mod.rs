//! Shared data structures for the telemetry ETL
//!
//! - `RawRecord` / `SensorPayload`: wire format read from the record store
//! - `LocationBucket`: hourly location aggregate (relational store)
//! - `SampleTable` / `SampleRow`: resampled sensor table (blob export)
//! - `BatchSummary`: outcome of one batch run

mod bucket;
mod record;
mod summary;
mod table;

pub use bucket::*;
pub use record::*;
pub use summary::*;
pub use table::*;
