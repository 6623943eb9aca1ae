//! Resampled sensor table types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed leading columns of every sensor table.
pub const FIXED_COLUMNS: [&str; 3] = ["timestamp", "lat", "lon"];

/// One reconstructed sample timestamp with every sensor value that landed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    /// Sample time in milliseconds since epoch (unique within a table)
    pub timestamp: i64,
    /// Position of the record that wrote the first sample at this timestamp
    pub lat: f64,
    pub lon: f64,
    /// Sparse sensor id -> value mapping
    pub values: HashMap<String, f64>,
}

impl SampleRow {
    pub fn new(timestamp: i64, lat: f64, lon: f64) -> Self {
        Self {
            timestamp,
            lat,
            lon,
            values: HashMap::new(),
        }
    }

    pub fn value(&self, sensor_id: &str) -> Option<f64> {
        self.values.get(sensor_id).copied()
    }
}

/// Wide-format sensor table: `[timestamp, lat, lon, ...sensor ids]` columns,
/// rows ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleTable {
    pub columns: Vec<String>,
    pub rows: Vec<SampleRow>,
}

impl Default for SampleTable {
    fn default() -> Self {
        Self {
            columns: FIXED_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

impl SampleTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Sensor columns in header order.
    pub fn sensor_ids(&self) -> &[String] {
        &self.columns[FIXED_COLUMNS.len().min(self.columns.len())..]
    }

    /// Times of the first and last rows.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = DateTime::from_timestamp_millis(self.rows.first()?.timestamp)?;
        let last = DateTime::from_timestamp_millis(self.rows.last()?.timestamp)?;
        Some((first, last))
    }
}
