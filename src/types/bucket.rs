//! Hourly location bucket types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One location fix inside a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
}

/// Hour-aligned aggregate of location points.
///
/// Invariants:
/// - every point's timestamp floored to the hour equals `bucket_start`
/// - `bucket_end >= bucket_start`, and it only moves forward
/// - `count == points.len()` and is never zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationBucket {
    pub batch_id: String,
    pub bucket_start: DateTime<Utc>,
    pub bucket_end: DateTime<Utc>,
    pub count: usize,
    pub points: Vec<LocationPoint>,
}

impl LocationBucket {
    /// Open a bucket with its first point. `bucket_end` starts at that
    /// point's time.
    pub fn open(batch_id: &str, bucket_start: DateTime<Utc>, first: LocationPoint) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            bucket_start,
            bucket_end: first.timestamp,
            count: 1,
            points: vec![first],
        }
    }

    /// Append a point, advancing `bucket_end` if the point is later.
    pub fn push(&mut self, point: LocationPoint) {
        if point.timestamp > self.bucket_end {
            self.bucket_end = point.timestamp;
        }
        self.points.push(point);
        self.count = self.points.len();
    }
}
