use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::models::time_buckets;
use crate::db::{AqiRecord, DbError};
use crate::fetchers::AqiReading;

/// Append-only store of resolved readings. The resolver appends on every
/// successful live fetch and reads back for the cached fallback; the
/// forecast reads the trailing window. Nothing in this subsystem updates
/// or deletes.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(&self, reading: &AqiReading) -> Result<AqiRecord, DbError>;

    /// Most recent record for a city, by reading timestamp.
    async fn latest_for_city(&self, city: &str) -> Result<Option<AqiRecord>, DbError>;

    /// All records for a city at or after `cutoff`, oldest first.
    async fn since(&self, city: &str, cutoff: DateTime<Utc>)
        -> Result<Vec<AqiRecord>, DbError>;
}

const RECORD_COLUMNS: &str = "id, city, state, station, aqi, pm25, pm10, no2, so2, co, o3, \
     source, recorded_at, hour, day_of_week, month, created_at";

#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    #[instrument(skip(self, reading), fields(city = %reading.city, source = %reading.source))]
    async fn insert(&self, reading: &AqiReading) -> Result<AqiRecord, DbError> {
        let (hour, day_of_week, month) = time_buckets(reading.recorded_at);

        let record = sqlx::query_as::<_, AqiRecord>(&format!(
            r#"
            INSERT INTO aqi_readings
                (city, state, station, aqi, pm25, pm10, no2, so2, co, o3,
                 source, recorded_at, hour, day_of_week, month)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(&reading.city)
        .bind(&reading.state)
        .bind(&reading.station)
        .bind(reading.aqi)
        .bind(reading.pollutants.pm25)
        .bind(reading.pollutants.pm10)
        .bind(reading.pollutants.no2)
        .bind(reading.pollutants.so2)
        .bind(reading.pollutants.co)
        .bind(reading.pollutants.o3)
        .bind(reading.source.as_str())
        .bind(reading.recorded_at)
        .bind(hour)
        .bind(day_of_week)
        .bind(month)
        .fetch_one(&self.pool)
        .await?;

        debug!("Appended historical record {}", record.id);
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn latest_for_city(&self, city: &str) -> Result<Option<AqiRecord>, DbError> {
        debug!("Querying latest record for {}", city);

        let record = sqlx::query_as::<_, AqiRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM aqi_readings
            WHERE city = $1
            ORDER BY recorded_at DESC
            LIMIT 1
            "#
        ))
        .bind(city)
        .fetch_optional(&self.pool)
        .await?;

        if record.is_some() {
            debug!("Found latest record for {}", city);
        } else {
            debug!("No records found for {}", city);
        }

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn since(
        &self,
        city: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AqiRecord>, DbError> {
        debug!("Querying records for {} since {}", city, cutoff);

        let records = sqlx::query_as::<_, AqiRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM aqi_readings
            WHERE city = $1 AND recorded_at >= $2
            ORDER BY recorded_at ASC
            "#
        ))
        .bind(city)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} records", records.len());
        Ok(records)
    }
}
