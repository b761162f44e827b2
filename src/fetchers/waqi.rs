use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::aqi;
use crate::fetch_error::SourceError;
use crate::fetchers::{numeric_value, round_component, AqiReading, Pollutants, Source, REQUEST_TIMEOUT};

// WAQI reports `data` as an object on success and as a bare error string
// otherwise, so the envelope keeps it raw until the status is checked.
#[derive(Debug, Deserialize)]
struct WaqiEnvelope {
    status: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WaqiData {
    // "-" when the station has no current index
    #[serde(default)]
    aqi: serde_json::Value,
    city: Option<WaqiCity>,
    #[serde(default)]
    iaqi: WaqiIaqi,
    time: Option<WaqiTime>,
}

#[derive(Debug, Deserialize)]
struct WaqiCity {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WaqiIaqi {
    pm25: Option<WaqiMetric>,
    pm10: Option<WaqiMetric>,
    no2: Option<WaqiMetric>,
    so2: Option<WaqiMetric>,
    co: Option<WaqiMetric>,
    o3: Option<WaqiMetric>,
}

#[derive(Debug, Deserialize)]
struct WaqiMetric {
    v: f64,
}

#[derive(Debug, Deserialize)]
struct WaqiTime {
    iso: Option<String>,
}

/// Client for the World Air Quality Index city feed. WAQI aggregates CPCB
/// and other Indian monitoring networks and already reports on the Indian
/// AQI scale, so no numeric conversion happens here.
#[derive(Clone)]
pub struct WaqiFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WaqiFetcher {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    #[instrument(skip(self), fields(city = %city))]
    pub async fn fetch(&self, city: &str) -> Result<AqiReading, SourceError> {
        let token = self
            .api_key
            .as_deref()
            .ok_or(SourceError::NotConfigured("WAQI_API_KEY"))?;

        let url = format!("{}/feed/{}/", self.base_url, city.to_lowercase());
        debug!("Sending HTTP request to WAQI feed");
        let response = self
            .client
            .get(&url)
            .query(&[("token", token)])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        debug!("Received HTTP response with status: {}", response.status());

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body = response.text().await?;
        self.parse_payload(city, &body)
    }

    fn parse_payload(&self, city: &str, body: &str) -> Result<AqiReading, SourceError> {
        let envelope: WaqiEnvelope =
            serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

        if envelope.status != "ok" {
            return Err(SourceError::Empty(format!(
                "WAQI status '{}' for {}",
                envelope.status, city
            )));
        }

        let data: WaqiData = serde_json::from_value(envelope.data)
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let aqi = numeric_value(&data.aqi)
            .ok_or_else(|| SourceError::Empty(format!("WAQI reported no index for {}", city)))?;

        // Station names read "Anand Vihar, Delhi, Delhi, India"; the first
        // segment is the display city.
        let station = data
            .city
            .and_then(|c| c.name)
            .unwrap_or_else(|| city.to_string());
        let display_city = station
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(city)
            .to_string();

        let recorded_at = data
            .time
            .and_then(|t| t.iso)
            .and_then(|iso| DateTime::parse_from_rfc3339(&iso).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(AqiReading {
            city: display_city,
            state: None,
            station,
            aqi: aqi::clamp_aqi(aqi.round() as i64),
            pollutants: Pollutants {
                pm25: data.iaqi.pm25.map(|m| round_component(m.v)).unwrap_or(0),
                pm10: data.iaqi.pm10.map(|m| round_component(m.v)).unwrap_or(0),
                no2: data.iaqi.no2.map(|m| round_component(m.v)).unwrap_or(0),
                so2: data.iaqi.so2.map(|m| round_component(m.v)).unwrap_or(0),
                co: data.iaqi.co.map(|m| round_component(m.v)).unwrap_or(0),
                o3: data.iaqi.o3.map(|m| round_component(m.v)).unwrap_or(0),
            },
            source: Source::Waqi,
            recorded_at,
        })
    }
}
