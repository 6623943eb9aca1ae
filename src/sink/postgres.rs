//! PostgreSQL aggregate sink
//!
//! Buckets land in `location_buckets`, one row per `(batch_id, start_time)`.
//! Points are stored as a JSONB array of `{ts, lat, lon}`. Re-running a batch
//! inserts nothing new: conflicting rows are skipped.

use super::{AggregateSink, SinkError};
use crate::config::DatabaseConfig;
use crate::types::{LocationBucket, LocationPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, info};

const INSERT_BUCKET: &str = r#"INSERT INTO location_buckets (batch_id, start_time, end_time, count, data)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (batch_id, start_time) DO NOTHING"#;

/// Aggregate sink backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PostgresBucketSink {
    pool: PgPool,
}

impl PostgresBucketSink {
    /// Connect, and run migrations when configured to.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, SinkError> {
        if config.url.is_empty() {
            return Err(SinkError::Config(
                "database.url is empty; set it in the config or via DATABASE_URL".to_string(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        info!("Connected to PostgreSQL");

        let sink = Self::from_pool(pool);
        if config.run_migrations {
            sink.run_migrations().await?;
        }
        Ok(sink)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations from the migrations/ directory
    pub async fn run_migrations(&self) -> Result<(), SinkError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Read back every stored bucket of a batch, oldest first.
    pub async fn fetch_batch(&self, batch_id: &str) -> Result<Vec<LocationBucket>, SinkError> {
        let rows: Vec<(String, DateTime<Utc>, DateTime<Utc>, i32, serde_json::Value)> =
            sqlx::query_as(
                r#"SELECT batch_id, start_time, end_time, count, data
                   FROM location_buckets WHERE batch_id = $1 ORDER BY start_time"#,
            )
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(batch_id, start, end, count, data)| -> Result<LocationBucket, SinkError> {
                let points: Vec<LocationPoint> = serde_json::from_value(data)?;
                Ok(LocationBucket {
                    batch_id,
                    bucket_start: start,
                    bucket_end: end,
                    count: usize::try_from(count).unwrap_or(points.len()),
                    points,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AggregateSink for PostgresBucketSink {
    async fn store(&self, buckets: &[LocationBucket]) -> Result<u64, SinkError> {
        if buckets.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for bucket in buckets {
            let data = serde_json::to_value(&bucket.points)?;
            let count = i32::try_from(bucket.count).unwrap_or(i32::MAX);
            let result = sqlx::query(INSERT_BUCKET)
                .bind(&bucket.batch_id)
                .bind(bucket.bucket_start)
                .bind(bucket.bucket_end)
                .bind(count)
                .bind(data)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        debug!(
            submitted = buckets.len(),
            inserted,
            skipped = buckets.len() as u64 - inserted,
            "Stored location buckets"
        );
        Ok(inserted)
    }

    fn sink_name(&self) -> &str {
        "postgres"
    }
}
