//! Bucketizer - groups record positions into hour-aligned buckets
//!
//! Records without a usable event time or position are skipped silently.
//! Buckets come back in the order their hour was first seen.

use crate::types::{LocationBucket, LocationPoint, RawRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Milliseconds per hour
pub const HOUR_MS: i64 = 3_600_000;

/// Truncate an epoch-millisecond time to the top of its UTC hour.
/// `None` when the floor is not representable.
pub fn hour_floor_ms(millis: i64) -> Option<i64> {
    millis.checked_sub(millis.rem_euclid(HOUR_MS))
}

/// Group records into hourly location buckets.
pub fn bucketize(records: &[RawRecord]) -> Vec<LocationBucket> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut buckets: Vec<LocationBucket> = Vec::new();

    for record in records {
        let Some(millis) = record.event_time_ms() else {
            continue;
        };
        let Some((lat, lon)) = record.coordinates() else {
            continue;
        };
        let (Some(at), Some(start)) = (
            to_datetime(millis),
            hour_floor_ms(millis).and_then(to_datetime),
        ) else {
            continue;
        };

        let point = LocationPoint { timestamp: at, lat, lon };
        let key = start.timestamp_millis();

        match index.get(&key) {
            Some(&slot) => buckets[slot].push(point),
            None => {
                index.insert(key, buckets.len());
                buckets.push(LocationBucket::open(&record.batch_id, start, point));
            }
        }
    }

    buckets
}

fn to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Timelike};

    fn fix(id: &str, millis: i64, lat: f64, lon: f64) -> RawRecord {
        RawRecord::new("batch-1", id)
            .with_timestamp(millis)
            .with_position(lat, lon)
    }

    #[test]
    fn test_hour_floor() {
        assert_eq!(hour_floor_ms(1_000_000), Some(0));
        assert_eq!(hour_floor_ms(HOUR_MS), Some(HOUR_MS));
        assert_eq!(hour_floor_ms(HOUR_MS * 5 + 59 * 60_000 + 999), Some(HOUR_MS * 5));
        assert_eq!(hour_floor_ms(-1), Some(-HOUR_MS));
        assert_eq!(hour_floor_ms(i64::MIN), None);
    }

    #[test]
    fn test_extreme_timestamps_are_skipped() {
        let mut huge_negative = RawRecord::new("batch-1", "neg").with_position(1.0, 2.0);
        huge_negative.timestamp = Some(serde_json::json!(-9.3e18));
        let mut huge_positive = RawRecord::new("batch-1", "pos").with_position(1.0, 2.0);
        huge_positive.timestamp = Some(serde_json::json!(1e30));

        let records = vec![huge_negative, huge_positive, fix("ok", 5_000, 7.0, 8.0)];
        let buckets = bucketize(&records);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 1);
    }

    #[test]
    fn test_two_records_one_hour_apart() {
        let records = vec![
            fix("r1", 1_000_000, 1.0, 2.0),
            fix("r2", 1_000_000 + 3_600_001, 3.0, 4.0),
        ];

        let mut buckets = bucketize(&records);
        buckets.sort_by_key(|b| b.bucket_start);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].bucket_start - buckets[0].bucket_start, Duration::hours(1));
        for b in &buckets {
            assert_eq!(b.count, 1);
            assert_eq!(b.points.len(), 1);
            assert_eq!(b.batch_id, "batch-1");
        }
        assert_eq!(buckets[0].points[0].lat, 1.0);
        assert_eq!(buckets[1].points[0].lon, 4.0);
    }

    #[test]
    fn test_skips_zero_timestamp_and_missing_position() {
        let records = vec![
            fix("zero", 0, 1.0, 2.0),
            RawRecord::new("batch-1", "no-pos").with_timestamp(5_000),
            fix("ok", 5_000, 7.0, 8.0),
        ];

        let buckets = bucketize(&records);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[0].points[0].lat, 7.0);
    }

    #[test]
    fn test_bucket_end_tracks_latest_out_of_order() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap().timestamp_millis();
        let records = vec![
            fix("a", base + 20 * 60_000, 0.0, 0.0),
            fix("b", base + 50 * 60_000, 0.0, 0.0),
            fix("c", base + 5 * 60_000, 0.0, 0.0),
        ];

        let buckets = bucketize(&records);
        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[0];
        assert_eq!(bucket.bucket_start.timestamp_millis(), base);
        assert_eq!(bucket.bucket_end.timestamp_millis(), base + 50 * 60_000);
        assert_eq!(bucket.count, 3);
        // points keep arrival order
        assert_eq!(bucket.points[2].timestamp.minute(), 5);
    }

    #[test]
    fn test_first_seen_order_and_batch_of_creator() {
        let records = vec![
            RawRecord::new("first", "a").with_timestamp(HOUR_MS * 3 + 1).with_position(0.0, 0.0),
            RawRecord::new("second", "b").with_timestamp(HOUR_MS + 1).with_position(0.0, 0.0),
            RawRecord::new("third", "c").with_timestamp(HOUR_MS * 3 + 2).with_position(0.0, 0.0),
        ];

        let buckets = bucketize(&records);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket_start.timestamp_millis(), HOUR_MS * 3);
        assert_eq!(buckets[0].batch_id, "first");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].batch_id, "second");
    }

    #[test]
    fn test_empty_input() {
        assert!(bucketize(&[]).is_empty());
    }
}
