use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::aqi;
use crate::fetch_error::SourceError;
use crate::fetchers::{round_component, AqiReading, Pollutants, Source, REQUEST_TIMEOUT};

#[derive(Debug, Deserialize)]
struct OwmEnvelope {
    #[serde(default)]
    list: Vec<OwmEntry>,
}

#[derive(Debug, Deserialize)]
struct OwmEntry {
    dt: Option<i64>,
    #[serde(default)]
    components: OwmComponents,
}

#[derive(Debug, Default, Deserialize)]
struct OwmComponents {
    #[serde(default)]
    co: f64,
    #[serde(default)]
    no2: f64,
    #[serde(default)]
    o3: f64,
    #[serde(default)]
    so2: f64,
    #[serde(default)]
    pm2_5: f64,
    #[serde(default)]
    pm10: f64,
}

/// Client for the OpenWeatherMap air-pollution endpoint. Works worldwide by
/// coordinates but returns raw concentrations, so the AQI is derived from
/// PM2.5 via the Indian breakpoint table.
#[derive(Clone)]
pub struct OpenWeatherFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherFetcher {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// `city` is a display label only; the lookup itself is by coordinates.
    #[instrument(skip(self), fields(lat = %lat, lon = %lon))]
    pub async fn fetch(&self, lat: f64, lon: f64, city: &str) -> Result<AqiReading, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::NotConfigured("OPENWEATHER_API_KEY"))?;

        let url = format!("{}/data/2.5/air_pollution", self.base_url);
        debug!("Sending HTTP request to OpenWeatherMap air pollution API");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key.to_string()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        debug!("Received HTTP response with status: {}", response.status());

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body = response.text().await?;
        self.parse_payload(lat, lon, city, &body)
    }

    fn parse_payload(
        &self,
        lat: f64,
        lon: f64,
        city: &str,
        body: &str,
    ) -> Result<AqiReading, SourceError> {
        let envelope: OwmEnvelope =
            serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

        let entry = envelope.list.into_iter().next().ok_or_else(|| {
            SourceError::Empty(format!("no air pollution data at {},{}", lat, lon))
        })?;

        let recorded_at = entry
            .dt
            .and_then(|dt| DateTime::from_timestamp(dt, 0))
            .unwrap_or_else(Utc::now);

        let components = entry.components;
        Ok(AqiReading {
            city: city.to_string(),
            state: None,
            station: format!("{:.4},{:.4}", lat, lon),
            aqi: aqi::aqi_from_pm25(components.pm2_5),
            pollutants: Pollutants {
                pm25: round_component(components.pm2_5),
                pm10: round_component(components.pm10),
                no2: round_component(components.no2),
                so2: round_component(components.so2),
                // CO comes back in µg/m³ and dwarfs the other values;
                // scaled down to the display range used by the other sources
                co: round_component(components.co / 100.0),
                o3: round_component(components.o3),
            },
            source: Source::Openweathermap,
            recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "coord": {"lon": 77.2167, "lat": 28.6667},
        "list": [
            {
                "main": {"aqi": 4},
                "components": {
                    "co": 1001.36,
                    "no": 0.05,
                    "no2": 36.33,
                    "o3": 30.4,
                    "so2": 7.99,
                    "pm2_5": 75.5,
                    "pm10": 103.6,
                    "nh3": 8.17
                },
                "dt": 1770390000
            }
        ]
    }"#;

    #[test]
    fn test_parse_payload() {
        let fetcher = OpenWeatherFetcher::new(String::new(), None);
        let reading = fetcher
            .parse_payload(28.6667, 77.2167, "Delhi", SAMPLE)
            .unwrap();

        assert_eq!(reading.city, "Delhi");
        assert_eq!(reading.station, "28.6667,77.2167");
        // 75.5 µg/m³ PM2.5 falls in the 61-90 -> 101-200 tier
        assert_eq!(reading.aqi, aqi::aqi_from_pm25(75.5));
        assert_eq!(reading.pollutants.pm25, 76);
        assert_eq!(reading.pollutants.pm10, 104);
        assert_eq!(reading.pollutants.co, 10);
        assert_eq!(reading.source, Source::Openweathermap);
        assert_eq!(reading.recorded_at, DateTime::from_timestamp(1770390000, 0).unwrap());
    }

    #[test]
    fn test_parse_payload_empty_list() {
        let fetcher = OpenWeatherFetcher::new(String::new(), None);
        let result = fetcher.parse_payload(0.0, 0.0, "Nowhere", r#"{"list": []}"#);
        assert!(matches!(result, Err(SourceError::Empty(_))));
    }

    #[test]
    fn test_parse_payload_missing_components_defaults() {
        let body = r#"{"list": [{"dt": 1770390000}]}"#;
        let fetcher = OpenWeatherFetcher::new(String::new(), None);
        let reading = fetcher.parse_payload(10.0, 20.0, "Empty", body).unwrap();
        assert_eq!(reading.aqi, 0);
        assert_eq!(reading.pollutants, Pollutants::default());
    }
}
