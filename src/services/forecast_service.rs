use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::{info, instrument};

use crate::db::{AqiRecord, ForecastEntry, ForecastResponse, HistoryStore};
use crate::services::aqi_service::ResolveError;

/// Predicted AQI for hours the trailing window has no data for.
pub const DEFAULT_FORECAST_AQI: i32 = 100;

/// How far back the hourly averages look.
pub const HISTORY_WINDOW_DAYS: i64 = 7;

/// Naive seasonal-average forecaster: the prediction for each of the next
/// 24 hours is the mean AQI observed at that hour of day over the trailing
/// week. Not a real forecasting model; documented as-is.
#[derive(Clone)]
pub struct ForecastService {
    history: Arc<dyn HistoryStore>,
}

impl ForecastService {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }

    #[instrument(skip(self))]
    pub async fn forecast(&self, city: &str) -> Result<ForecastResponse, ResolveError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(ResolveError::InvalidLocation);
        }

        let now = Utc::now();
        let cutoff = now - Duration::days(HISTORY_WINDOW_DAYS);
        let records = self.history.since(city, cutoff).await?;

        if records.is_empty() {
            return Err(ResolveError::NoDataAvailable(city.to_string()));
        }

        let averages = hourly_averages(&records);
        let forecast = build_entries(&averages, now);

        info!(
            "Generated 24-hour forecast for {} from {} records covering {} distinct hours",
            city,
            records.len(),
            averages.len()
        );

        Ok(ForecastResponse {
            city: city.to_string(),
            forecast,
        })
    }
}

/// Mean AQI per stored hour-of-day bucket, rounded.
fn hourly_averages(records: &[AqiRecord]) -> HashMap<i16, i32> {
    let mut sums: HashMap<i16, (i64, u32)> = HashMap::new();
    for record in records {
        let entry = sums.entry(record.hour).or_insert((0, 0));
        entry.0 += i64::from(record.aqi);
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(hour, (sum, count))| (hour, (sum as f64 / f64::from(count)).round() as i32))
        .collect()
}

/// 24 entries starting at the current hour, wrapping past midnight.
fn build_entries(averages: &HashMap<i16, i32>, now: DateTime<Utc>) -> Vec<ForecastEntry> {
    (0..24i16)
        .map(|offset| {
            let hour = ((now.hour() as i16) + offset) % 24;
            ForecastEntry {
                hour,
                aqi: averages.get(&hour).copied().unwrap_or(DEFAULT_FORECAST_AQI),
                timestamp: now + Duration::hours(i64::from(offset)),
            }
        })
        .collect()
}
