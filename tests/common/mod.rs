// Shared fixtures for the integration tests: an in-memory HistoryStore
// double (the resolver and forecast services only see the trait) and
// canned provider payloads for mockito-backed servers.
#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use aqi_tracker_service::db::{time_buckets, AqiRecord, DbError, HistoryStore};
use aqi_tracker_service::fetchers::{AqiReading, CpcbFetcher, OpenWeatherFetcher, WaqiFetcher};
use aqi_tracker_service::services::AqiService;

#[derive(Default)]
pub struct InMemoryHistory {
    records: Mutex<Vec<AqiRecord>>,
    next_id: AtomicI64,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn records(&self) -> Vec<AqiRecord> {
        self.records.lock().await.clone()
    }

    pub async fn seed(&self, record: AqiRecord) {
        self.records.lock().await.push(record);
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn insert(&self, reading: &AqiReading) -> Result<AqiRecord, DbError> {
        let (hour, day_of_week, month) = time_buckets(reading.recorded_at);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = AqiRecord {
            id,
            city: reading.city.clone(),
            state: reading.state.clone(),
            station: reading.station.clone(),
            aqi: reading.aqi,
            pm25: reading.pollutants.pm25,
            pm10: reading.pollutants.pm10,
            no2: reading.pollutants.no2,
            so2: reading.pollutants.so2,
            co: reading.pollutants.co,
            o3: reading.pollutants.o3,
            source: reading.source.as_str().to_string(),
            recorded_at: reading.recorded_at,
            hour,
            day_of_week,
            month,
            created_at: Utc::now(),
        };
        self.records.lock().await.push(record.clone());
        Ok(record)
    }

    async fn latest_for_city(&self, city: &str) -> Result<Option<AqiRecord>, DbError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.city == city)
            .max_by_key(|r| r.recorded_at)
            .cloned())
    }

    async fn since(&self, city: &str, cutoff: DateTime<Utc>) -> Result<Vec<AqiRecord>, DbError> {
        let records = self.records.lock().await;
        let mut matching: Vec<_> = records
            .iter()
            .filter(|r| r.city == city && r.recorded_at >= cutoff)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.recorded_at);
        Ok(matching)
    }
}

/// A fully-populated record with derived buckets computed from the timestamp.
pub fn record(id: i64, city: &str, aqi: i32, recorded_at: DateTime<Utc>) -> AqiRecord {
    let (hour, day_of_week, month) = time_buckets(recorded_at);
    AqiRecord {
        id,
        city: city.to_string(),
        state: None,
        station: "Test Station".to_string(),
        aqi,
        pm25: aqi,
        pm10: 0,
        no2: 0,
        so2: 0,
        co: 0,
        o3: 0,
        source: "waqi".to_string(),
        recorded_at,
        hour,
        day_of_week,
        month,
        created_at: recorded_at,
    }
}

/// An AqiService with every provider pointed at the given base URLs and
/// test credentials in place, backed by the shared in-memory history.
pub fn service(
    history: Arc<InMemoryHistory>,
    waqi_url: &str,
    openweather_url: &str,
    cpcb_url: &str,
) -> AqiService {
    AqiService::new(
        WaqiFetcher::new(waqi_url.to_string(), Some("test-token".to_string())),
        OpenWeatherFetcher::new(openweather_url.to_string(), Some("test-key".to_string())),
        CpcbFetcher::new(
            cpcb_url.to_string(),
            Some("test-key".to_string()),
            Some("test-resource".to_string()),
        ),
        history,
    )
}

pub fn waqi_body(aqi: i32, station: &str) -> String {
    format!(
        r#"{{
            "status": "ok",
            "data": {{
                "aqi": {aqi},
                "city": {{"name": "{station}"}},
                "iaqi": {{"pm25": {{"v": {aqi}}}, "pm10": {{"v": 80}}}},
                "time": {{"iso": "2026-08-06T10:00:00+05:30"}}
            }}
        }}"#
    )
}

pub fn openweather_body(pm25: f64) -> String {
    format!(
        r#"{{
            "list": [
                {{
                    "main": {{"aqi": 3}},
                    "components": {{
                        "co": 450.6, "no2": 18.2, "o3": 22.9,
                        "so2": 3.1, "pm2_5": {pm25}, "pm10": 88.0
                    }},
                    "dt": 1770390000
                }}
            ]
        }}"#
    )
}

pub fn cpcb_body(city: &str, pm25: f64) -> String {
    format!(
        r#"{{
            "records": [
                {{
                    "city": "{city}",
                    "state": "Delhi",
                    "station": "ITO, {city} - CPCB",
                    "pollutant_id": "PM2.5",
                    "pollutant_avg": "{pm25}",
                    "last_update": "06-08-2026 13:00:00"
                }}
            ]
        }}"#
    )
}
