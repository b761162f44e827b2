use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod cpcb;
pub mod openweather;
pub mod waqi;

pub use cpcb::CpcbFetcher;
pub use openweather::OpenWeatherFetcher;
pub use waqi::WaqiFetcher;

/// Per-request timeout applied by every provider client. There is no retry
/// or circuit breaking on top of this; a source that times out is simply
/// unavailable for the current request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Which provider produced a reading. `Cached` marks readings replayed from
/// the historical store when every live source failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Waqi,
    Openweathermap,
    Cpcb,
    Cached,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Waqi => "waqi",
            Source::Openweathermap => "openweathermap",
            Source::Cpcb => "cpcb",
            Source::Cached => "cached",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounded pollutant concentrations. Values are clamped at zero; the
/// providers occasionally report small negative calibration artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pollutants {
    pub pm25: i32,
    pub pm10: i32,
    pub no2: i32,
    pub so2: i32,
    pub co: i32,
    pub o3: i32,
}

// Note: This is the "fetched" reading shape shared by all provider clients.
// The persisted form AqiRecord (in db/models.rs) adds id, derived time
// buckets and created_at.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AqiReading {
    pub city: String,
    pub state: Option<String>,
    pub station: String,
    pub aqi: i32,
    pub pollutants: Pollutants,
    pub source: Source,
    pub recorded_at: DateTime<Utc>,
}

/// Round a raw concentration to the integer scale used everywhere in the
/// API, clamping negatives to zero.
pub(crate) fn round_component(value: f64) -> i32 {
    value.max(0.0).round() as i32
}

/// Extract a number from a JSON field that providers serve either as a
/// number or as a numeric string ("12.5"). Anything else (WAQI's "-",
/// CPCB's "NA") is no value.
pub(crate) fn numeric_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_component() {
        assert_eq!(round_component(12.4), 12);
        assert_eq!(round_component(12.5), 13);
        assert_eq!(round_component(-0.3), 0);
    }

    #[test]
    fn test_numeric_value() {
        assert_eq!(numeric_value(&json!(42)), Some(42.0));
        assert_eq!(numeric_value(&json!(13.7)), Some(13.7));
        assert_eq!(numeric_value(&json!("91.25")), Some(91.25));
        assert_eq!(numeric_value(&json!("NA")), None);
        assert_eq!(numeric_value(&json!("-")), None);
        assert_eq!(numeric_value(&json!(null)), None);
    }

    #[test]
    fn test_source_tags_round_trip() {
        for source in [
            Source::Waqi,
            Source::Openweathermap,
            Source::Cpcb,
            Source::Cached,
        ] {
            let tag = serde_json::to_string(&source).unwrap();
            assert_eq!(tag, format!("\"{}\"", source.as_str()));
            let back: Source = serde_json::from_str(&tag).unwrap();
            assert_eq!(back, source);
        }
    }
}
