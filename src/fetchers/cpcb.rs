use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::aqi;
use crate::fetch_error::SourceError;
use crate::fetchers::{numeric_value, round_component, AqiReading, Pollutants, Source, REQUEST_TIMEOUT};

#[derive(Debug, Deserialize)]
struct CpcbEnvelope {
    #[serde(default)]
    records: Vec<CpcbRecord>,
}

#[derive(Debug, Deserialize)]
struct CpcbRecord {
    city: Option<String>,
    state: Option<String>,
    station: Option<String>,
    pollutant_id: Option<String>,
    // served as a number or as a string, "NA" when the station is down
    #[serde(default)]
    pollutant_avg: serde_json::Value,
    last_update: Option<String>,
}

#[derive(Debug, Default)]
struct PollutantSums {
    pm25: f64,
    pm10: f64,
    no2: f64,
    so2: f64,
    co: f64,
    o3: f64,
}

/// Client for the CPCB real-time feed on data.gov.in. One record per
/// station per pollutant; records for the city are aggregated by summing
/// the per-pollutant averages and taking the maximum pollutant sum as the
/// AQI. This is a simplification of the official sub-index formula, kept
/// as documented behavior.
#[derive(Clone)]
pub struct CpcbFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    resource_id: Option<String>,
}

impl CpcbFetcher {
    pub fn new(base_url: String, api_key: Option<String>, resource_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            resource_id,
        }
    }

    #[instrument(skip(self), fields(city = %city))]
    pub async fn fetch(&self, city: &str, state: Option<&str>) -> Result<AqiReading, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::NotConfigured("CPCB_API_KEY"))?;
        let resource_id = self
            .resource_id
            .as_deref()
            .ok_or(SourceError::NotConfigured("CPCB_RESOURCE_ID"))?;

        let url = format!("{}/resource/{}", self.base_url, resource_id);
        let mut params = vec![
            ("api-key", api_key.to_string()),
            ("format", "json".to_string()),
            ("limit", "10".to_string()),
            ("filters[city]", city.to_string()),
        ];
        if let Some(state) = state {
            params.push(("filters[state]", state.to_string()));
        }

        debug!("Sending HTTP request to data.gov.in CPCB resource");
        let response = self
            .client
            .get(&url)
            .query(&params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        debug!("Received HTTP response with status: {}", response.status());

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body = response.text().await?;
        self.parse_payload(city, state, &body)
    }

    fn parse_payload(
        &self,
        city: &str,
        state: Option<&str>,
        body: &str,
    ) -> Result<AqiReading, SourceError> {
        let envelope: CpcbEnvelope =
            serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

        if envelope.records.is_empty() {
            return Err(SourceError::Empty(format!("no CPCB records for {}", city)));
        }

        let mut sums = PollutantSums::default();
        for record in &envelope.records {
            let avg = numeric_value(&record.pollutant_avg).unwrap_or(0.0);
            match record.pollutant_id.as_deref() {
                Some("PM2.5") => sums.pm25 += avg,
                Some("PM10") => sums.pm10 += avg,
                Some("NO2") => sums.no2 += avg,
                Some("SO2") => sums.so2 += avg,
                Some("CO") => sums.co += avg,
                Some("Ozone") => sums.o3 += avg,
                other => {
                    warn!("Skipping unrecognized pollutant id {:?}", other);
                }
            }
        }

        let max_sum = [sums.pm25, sums.pm10, sums.no2, sums.so2, sums.co, sums.o3]
            .into_iter()
            .fold(0.0_f64, f64::max);

        let first = &envelope.records[0];
        let recorded_at = first
            .last_update
            .as_deref()
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, "%d-%m-%Y %H:%M:%S").ok())
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
            .unwrap_or_else(Utc::now);

        Ok(AqiReading {
            city: first.city.clone().unwrap_or_else(|| city.to_string()),
            state: first
                .state
                .clone()
                .or_else(|| state.map(str::to_string)),
            station: first
                .station
                .clone()
                .unwrap_or_else(|| "Multiple Stations".to_string()),
            aqi: aqi::clamp_aqi(max_sum.round() as i64),
            pollutants: Pollutants {
                pm25: round_component(sums.pm25),
                pm10: round_component(sums.pm10),
                no2: round_component(sums.no2),
                so2: round_component(sums.so2),
                co: round_component(sums.co),
                o3: round_component(sums.o3),
            },
            source: Source::Cpcb,
            recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "records": [
            {
                "city": "Delhi",
                "state": "Delhi",
                "station": "ITO, Delhi - CPCB",
                "pollutant_id": "PM2.5",
                "pollutant_avg": "98",
                "last_update": "06-08-2026 13:00:00"
            },
            {
                "city": "Delhi",
                "state": "Delhi",
                "station": "ITO, Delhi - CPCB",
                "pollutant_id": "PM10",
                "pollutant_avg": 161.5,
                "last_update": "06-08-2026 13:00:00"
            },
            {
                "city": "Delhi",
                "state": "Delhi",
                "station": "Sirifort, Delhi - CPCB",
                "pollutant_id": "PM2.5",
                "pollutant_avg": "104",
                "last_update": "06-08-2026 13:00:00"
            },
            {
                "city": "Delhi",
                "state": "Delhi",
                "station": "Sirifort, Delhi - CPCB",
                "pollutant_id": "NO2",
                "pollutant_avg": "NA",
                "last_update": "06-08-2026 13:00:00"
            }
        ]
    }"#;

    #[test]
    fn test_parse_payload_sums_pollutants_across_stations() {
        let fetcher = CpcbFetcher::new(String::new(), None, None);
        let reading = fetcher.parse_payload("Delhi", Some("Delhi"), SAMPLE).unwrap();

        // PM2.5 sums to 202 across the two stations and beats PM10's 162
        assert_eq!(reading.pollutants.pm25, 202);
        assert_eq!(reading.pollutants.pm10, 162);
        assert_eq!(reading.pollutants.no2, 0);
        assert_eq!(reading.aqi, 202);
        assert_eq!(reading.city, "Delhi");
        assert_eq!(reading.station, "ITO, Delhi - CPCB");
        assert_eq!(reading.source, Source::Cpcb);
    }

    #[test]
    fn test_parse_payload_last_update_timestamp() {
        let fetcher = CpcbFetcher::new(String::new(), None, None);
        let reading = fetcher.parse_payload("Delhi", None, SAMPLE).unwrap();
        assert_eq!(
            reading.recorded_at,
            DateTime::parse_from_rfc3339("2026-08-06T13:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_parse_payload_no_records() {
        let fetcher = CpcbFetcher::new(String::new(), None, None);
        let result = fetcher.parse_payload("Atlantis", None, r#"{"records": []}"#);
        assert!(matches!(result, Err(SourceError::Empty(_))));
    }

    #[test]
    fn test_parse_payload_caps_aqi_at_500() {
        let body = r#"{
            "records": [
                {"city": "Delhi", "station": "Peak", "pollutant_id": "PM10", "pollutant_avg": "800"}
            ]
        }"#;
        let fetcher = CpcbFetcher::new(String::new(), None, None);
        let reading = fetcher.parse_payload("Delhi", None, body).unwrap();
        assert_eq!(reading.aqi, 500);
        assert_eq!(reading.pollutants.pm10, 800);
        assert_eq!(reading.station, "Peak");
    }
}
