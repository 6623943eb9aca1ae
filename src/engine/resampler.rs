//! Waveform Resampler - expands sensor captures into a wide sample table
//!
//! Each capture covers one second. Sample `i` of `n` lands at
//! `base + round(i * 1000 / n)` ms. Samples from any sensor or record that
//! land on the same millisecond share a row; otherwise they get their own
//! sparse row. There is no tolerance window and no interpolation.

use crate::types::{RawRecord, SampleRow, SampleTable, FIXED_COLUMNS};
use std::collections::{BTreeMap, HashSet};

/// Capture window of one sensor payload in milliseconds
pub const CAPTURE_WINDOW_MS: f64 = 1000.0;

/// Offsets (ms from capture start) of `count` evenly spaced samples.
pub fn sample_offsets(count: usize) -> impl Iterator<Item = i64> {
    let step = CAPTURE_WINDOW_MS / count as f64;
    (0..count).map(move |i| (i as f64 * step).round() as i64)
}

/// Build the merged sensor table for a batch.
pub fn resample(records: &[RawRecord]) -> SampleTable {
    let mut rows: BTreeMap<i64, SampleRow> = BTreeMap::new();
    let mut table = SampleTable::default();
    let mut seen: HashSet<String> = HashSet::new();

    for record in records {
        let (lat, lon) = record.coordinates().unwrap_or((0.0, 0.0));

        for sensor in record.sensors() {
            let Some(sensor_id) = sensor.sensor_id() else {
                continue;
            };
            // Would shadow a fixed column in the header
            if FIXED_COLUMNS.contains(&sensor_id.as_str()) {
                continue;
            }
            let Some(base) = sensor.base_time_ms() else {
                continue;
            };
            let Some(readings) = sensor.readings() else {
                continue;
            };
            let Some(stamps) = sample_offsets(readings.len())
                .map(|offset| base.checked_add(offset))
                .collect::<Option<Vec<i64>>>()
            else {
                continue;
            };

            if seen.insert(sensor_id.clone()) {
                table.columns.push(sensor_id.clone());
            }

            for (at, value) in stamps.into_iter().zip(readings) {
                rows.entry(at)
                    .or_insert_with(|| SampleRow::new(at, lat, lon))
                    .values
                    .insert(sensor_id.clone(), value);
            }
        }
    }

    table.rows = rows.into_values().collect();
    table
}
