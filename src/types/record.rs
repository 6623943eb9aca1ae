//! Raw telemetry record types (wire format)
//!
//! Mirrors the stored JSON payload 1:1. Fields that arrive loosely typed
//! (positions, timestamps, sample arrays) are kept as `serde_json::Value` so a
//! malformed field only excludes the record from the stage that needs it,
//! instead of rejecting the whole record at deserialization time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ingested telemetry unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Batch the record belongs to
    #[serde(default)]
    pub batch_id: String,

    /// Record identifier within the batch (storage key)
    #[serde(default)]
    pub id: String,

    /// `[lat, lon]` pair, possibly absent or malformed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,

    /// Event time in milliseconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    /// Embedded sensor waveform captures; anything but an array is ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Value>,
}

impl RawRecord {
    pub fn new(batch_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_position(mut self, lat: f64, lon: f64) -> Self {
        self.position = Some(serde_json::json!([lat, lon]));
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(Value::from(millis));
        self
    }

    #[must_use]
    pub fn with_sensor(mut self, sensor: SensorPayload) -> Self {
        let Ok(payload) = serde_json::to_value(sensor) else {
            return self;
        };
        match self.sensors.get_or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(items) => items.push(payload),
            other => *other = Value::Array(vec![payload]),
        }
        self
    }

    /// Event time in milliseconds, `None` when absent, zero or non-numeric.
    pub fn event_time_ms(&self) -> Option<i64> {
        self.timestamp
            .as_ref()
            .and_then(numeric)
            .filter(|ms| ms.is_finite())
            .map(|ms| ms as i64)
            .filter(|&ms| ms != 0)
    }

    /// `(lat, lon)` when the position is an array whose first two elements
    /// are numeric.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let items = self.position.as_ref()?.as_array()?;
        if items.len() < 2 {
            return None;
        }
        let lat = numeric(&items[0])?;
        let lon = numeric(&items[1])?;
        Some((lat, lon))
    }

    /// Sensor payloads attached to this record. Empty when `sensors` is
    /// absent or not an array; entries that are not objects are skipped.
    pub fn sensors(&self) -> Vec<SensorPayload> {
        let Some(Value::Array(items)) = &self.sensors else {
            return Vec::new();
        };
        items
            .iter()
            .filter(|item| item.is_object())
            .filter_map(|item| SensorPayload::deserialize(item).ok())
            .collect()
    }
}

/// One sensor's waveform capture attached to a record.
///
/// The capture is assumed to span exactly one second with evenly spaced
/// samples starting at `timestamp` (whole seconds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorPayload {
    /// Sensor identifier, becomes a table column name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Capture start in seconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    /// Sample readings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Value>,

    /// Readings under `values`; preferred over `samples`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,

    /// Readings under `value`; preferred over `values` and `samples`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl SensorPayload {
    pub fn new(id: impl Into<String>, base_seconds: i64, samples: &[f64]) -> Self {
        Self {
            id: Some(Value::String(id.into())),
            timestamp: Some(Value::from(base_seconds)),
            samples: Some(Value::from(samples.to_vec())),
            ..Self::default()
        }
    }

    /// Sensor id as a column name. Numeric ids are rendered as text; empty
    /// strings yield `None`.
    pub fn sensor_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Capture start in milliseconds, `None` when absent, zero or non-numeric.
    pub fn base_time_ms(&self) -> Option<i64> {
        self.timestamp
            .as_ref()
            .and_then(numeric)
            .map(|secs| (secs * 1000.0).round())
            .filter(|ms| ms.is_finite() && *ms != 0.0)
            .map(|ms| ms as i64)
    }

    /// Sample readings when `samples` is a non-empty array. Elements that are
    /// not numeric keep their slot (spacing depends on the count) and read as
    /// NaN.
    pub fn readings(&self) -> Option<Vec<f64>> {
        let items = self
            .value
            .as_ref()
            .or(self.values.as_ref())
            .or(self.samples.as_ref())?
            .as_array()?;
        if items.is_empty() {
            return None;
        }
        Some(items.iter().map(|v| numeric(v).unwrap_or(f64::NAN)).collect())
    }
}

/// Numeric view of a JSON value: numbers as-is, numeric strings parsed.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_wire_record() {
        let record: RawRecord = serde_json::from_value(json!({
            "batch_id": "b-1",
            "id": "r-1",
            "position": [-23.5, -46.6],
            "timestamp": 1_700_000_000_123_i64,
            "sensors": [{ "id": "acc_x", "timestamp": 1_700_000_000, "values": [1, 2, 3] }]
        }))
        .unwrap();

        assert_eq!(record.coordinates(), Some((-23.5, -46.6)));
        assert_eq!(record.event_time_ms(), Some(1_700_000_000_123));
        let sensors = record.sensors();
        let sensor = &sensors[0];
        assert_eq!(sensor.sensor_id().as_deref(), Some("acc_x"));
        assert_eq!(sensor.base_time_ms(), Some(1_700_000_000_000));
        assert_eq!(sensor.readings(), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_malformed_position_is_none() {
        let mut record = RawRecord::new("b", "r");
        assert_eq!(record.coordinates(), None);

        record.position = Some(json!([1.0]));
        assert_eq!(record.coordinates(), None);

        record.position = Some(json!("1,2"));
        assert_eq!(record.coordinates(), None);

        record.position = Some(json!([1.0, "abc"]));
        assert_eq!(record.coordinates(), None);

        record.position = Some(json!(["1.5", 2]));
        assert_eq!(record.coordinates(), Some((1.5, 2.0)));
    }

    #[test]
    fn test_zero_or_missing_timestamp_is_none() {
        assert_eq!(RawRecord::new("b", "r").event_time_ms(), None);
        assert_eq!(RawRecord::new("b", "r").with_timestamp(0).event_time_ms(), None);

        let mut record = RawRecord::new("b", "r");
        record.timestamp = Some(json!("not a time"));
        assert_eq!(record.event_time_ms(), None);
    }

    #[test]
    fn test_sensor_payload_validation() {
        let empty_id = SensorPayload::new("", 5, &[1.0]);
        assert_eq!(empty_id.sensor_id(), None);

        let zero_base = SensorPayload::new("A", 0, &[1.0]);
        assert_eq!(zero_base.base_time_ms(), None);

        let no_samples = SensorPayload::new("A", 5, &[]);
        assert_eq!(no_samples.readings(), None);

        let numeric_id = SensorPayload {
            id: Some(json!(42)),
            ..SensorPayload::default()
        };
        assert_eq!(numeric_id.sensor_id().as_deref(), Some("42"));
    }

    #[test]
    fn test_non_numeric_sample_keeps_slot() {
        let sensor = SensorPayload {
            id: Some(json!("A")),
            timestamp: Some(json!(5)),
            samples: Some(json!([1, "x", 3])),
            ..SensorPayload::default()
        };
        let readings = sensor.readings().unwrap();
        assert_eq!(readings.len(), 3);
        assert!(readings[1].is_nan());
    }

    #[test]
    fn test_malformed_sensors_keep_record() {
        for sensors in [json!("n/a"), json!({}), json!(42)] {
            let record: RawRecord = serde_json::from_value(json!({
                "batch_id": "b",
                "id": "r",
                "position": [1.0, 2.0],
                "timestamp": 1_700_000_000_000_i64,
                "sensors": sensors
            }))
            .unwrap();
            assert!(record.sensors().is_empty());
            assert_eq!(record.coordinates(), Some((1.0, 2.0)));
            assert_eq!(record.event_time_ms(), Some(1_700_000_000_000));
        }
    }

    #[test]
    fn test_bad_sensor_entries_are_skipped() {
        let record: RawRecord = serde_json::from_value(json!({
            "batch_id": "b",
            "sensors": ["x", null, 3, { "id": "A", "timestamp": 5, "samples": [1] }]
        }))
        .unwrap();
        let sensors = record.sensors();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].sensor_id().as_deref(), Some("A"));
    }

    #[test]
    fn test_value_wins_over_values_and_samples() {
        let record: RawRecord = serde_json::from_value(json!({
            "batch_id": "b",
            "sensors": [{
                "id": "A",
                "timestamp": 5,
                "value": [1, 2],
                "values": [3, 4, 5],
                "samples": [6]
            }]
        }))
        .unwrap();
        assert_eq!(record.sensors()[0].readings(), Some(vec![1.0, 2.0]));

        let fallback = SensorPayload {
            values: Some(json!([3, 4])),
            samples: Some(json!([6])),
            ..SensorPayload::default()
        };
        assert_eq!(fallback.readings(), Some(vec![3.0, 4.0]));
    }

    #[test]
    fn test_with_sensor_appends() {
        let record = RawRecord::new("b", "r")
            .with_sensor(SensorPayload::new("A", 5, &[1.0]))
            .with_sensor(SensorPayload::new("B", 6, &[2.0]));
        let ids: Vec<_> = record.sensors().iter().filter_map(SensorPayload::sensor_id).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }
}
