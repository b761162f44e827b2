use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::fetchers::{AqiReading, Pollutants, Source};

// Database entity models
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AqiRecord {
    pub id: i64,
    pub city: String,
    pub state: Option<String>,
    pub station: String,
    pub aqi: i32,
    pub pm25: i32,
    pub pm10: i32,
    pub no2: i32,
    pub so2: i32,
    pub co: i32,
    pub o3: i32,
    pub source: String,
    pub recorded_at: DateTime<Utc>,
    pub hour: i16,
    pub day_of_week: i16,
    pub month: i16,
    pub created_at: DateTime<Utc>,
}

impl AqiRecord {
    /// Replay a persisted record as a reading served in place of live data.
    /// Whatever source originally produced the record, the replayed reading
    /// is tagged `cached`.
    pub fn into_cached_reading(self) -> AqiReading {
        AqiReading {
            city: self.city,
            state: self.state,
            station: self.station,
            aqi: self.aqi,
            pollutants: Pollutants {
                pm25: self.pm25,
                pm10: self.pm10,
                no2: self.no2,
                so2: self.so2,
                co: self.co,
                o3: self.o3,
            },
            source: Source::Cached,
            recorded_at: self.recorded_at,
        }
    }
}

/// Time buckets stored alongside each record for fallback lookup and
/// hourly averaging: hour of day 0-23, day of week with Sunday = 0, and
/// 1-based month.
pub fn time_buckets(timestamp: DateTime<Utc>) -> (i16, i16, i16) {
    (
        timestamp.hour() as i16,
        timestamp.weekday().num_days_from_sunday() as i16,
        timestamp.month() as i16,
    )
}

// API response DTOs (to avoid circular dependency between services and api modules)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForecastEntry {
    /// Hour of day 0-23
    pub hour: i16,
    /// Predicted AQI for that hour
    pub aqi: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForecastResponse {
    pub city: String,
    pub forecast: Vec<ForecastEntry>,
}
