use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use utoipa::IntoParams;

use crate::db::{DbError, HistoryStore};
use crate::fetchers::{AqiReading, CpcbFetcher, OpenWeatherFetcher, WaqiFetcher};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("a city name or a lat/lon pair is required")]
    InvalidLocation,
    #[error("no air quality data available for {0}")]
    NoDataAvailable(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Location selector accepted by the current-AQI endpoint. At least a city
/// name or a complete lat/lon pair must be present.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationQuery {
    pub city: Option<String>,
    pub state: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LocationQuery {
    pub fn for_city(city: &str, state: Option<&str>) -> Self {
        Self {
            city: Some(city.to_string()),
            state: state.map(str::to_string),
            ..Self::default()
        }
    }

    fn city(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }

    fn validate(&self) -> Result<(), ResolveError> {
        if self.city().is_none() && self.coordinates().is_none() {
            return Err(ResolveError::InvalidLocation);
        }
        Ok(())
    }
}

/// Resolves a current reading by trying sources in priority order: WAQI by
/// city, then OpenWeatherMap by coordinates, then the CPCB portal, then the
/// last known historical record. Each source is tried exactly once per
/// request; there is no retry or circuit breaking, so a source that is down
/// is simply tried again on the next request.
#[derive(Clone)]
pub struct AqiService {
    waqi: WaqiFetcher,
    openweather: OpenWeatherFetcher,
    cpcb: CpcbFetcher,
    history: Arc<dyn HistoryStore>,
}

impl AqiService {
    pub fn new(
        waqi: WaqiFetcher,
        openweather: OpenWeatherFetcher,
        cpcb: CpcbFetcher,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            waqi,
            openweather,
            cpcb,
            history,
        }
    }

    #[instrument(skip(self, query), fields(city = ?query.city, lat = ?query.lat, lon = ?query.lon))]
    pub async fn resolve(&self, query: &LocationQuery) -> Result<AqiReading, ResolveError> {
        query.validate()?;
        let city = query.city();

        if let Some(city) = city {
            match self.waqi.fetch(city).await {
                Ok(reading) => return self.record_and_return(reading).await,
                Err(e) => warn!("WAQI lookup failed for {}: {}", city, e),
            }
        }

        if let Some((lat, lon)) = query.coordinates() {
            match self
                .openweather
                .fetch(lat, lon, city.unwrap_or_default())
                .await
            {
                Ok(reading) => return self.record_and_return(reading).await,
                Err(e) => warn!("OpenWeatherMap lookup failed at {},{}: {}", lat, lon, e),
            }
        }

        if let Some(city) = city {
            match self.cpcb.fetch(city, query.state.as_deref()).await {
                Ok(reading) => return self.record_and_return(reading).await,
                Err(e) => warn!("CPCB lookup failed for {}: {}", city, e),
            }

            // Every live source is down; serve the last thing we saw
            if let Some(record) = self.history.latest_for_city(city).await? {
                info!(
                    "All live sources failed for {}, serving record from {}",
                    city, record.recorded_at
                );
                return Ok(record.into_cached_reading());
            }
        }

        Err(ResolveError::NoDataAvailable(
            city.unwrap_or("the requested location").to_string(),
        ))
    }

    async fn record_and_return(&self, reading: AqiReading) -> Result<AqiReading, ResolveError> {
        let record = self.history.insert(&reading).await?;
        debug!(
            "Resolved {} via {} (AQI {}), appended record {}",
            reading.city, reading.source, reading.aqi, record.id
        );
        Ok(reading)
    }
}
