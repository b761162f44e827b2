use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, instrument};

use crate::config::TrackedCity;
use crate::services::{AqiService, LocationQuery};

/// Pause between cities so a sweep stays under the providers' rate limits.
const CITY_PAUSE: Duration = Duration::from_secs(1);

/// Keep the tracked cities' readings fresh so their history is warm when a
/// live lookup falls back. Runs forever; failures are logged per city and
/// never abort the sweep.
#[instrument(skip(service, cities), fields(interval_minutes = %interval_minutes, cities = cities.len()))]
pub async fn start_refresh_scheduler(
    service: AqiService,
    cities: Vec<TrackedCity>,
    interval_minutes: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_minutes * 60));

    info!(
        "Refresh scheduler started with {} minute interval for {} cities",
        interval_minutes,
        cities.len()
    );

    loop {
        interval.tick().await;
        debug!("Scheduler tick - starting tracked city sweep");
        refresh_cities(&service, &cities).await;
    }
}

#[instrument(skip(service, cities))]
async fn refresh_cities(service: &AqiService, cities: &[TrackedCity]) {
    for tracked in cities {
        let query = LocationQuery::for_city(&tracked.city, tracked.state.as_deref());
        match service.resolve(&query).await {
            Ok(reading) => {
                info!(
                    "Refreshed {} (AQI {} via {})",
                    tracked.city, reading.aqi, reading.source
                );
            }
            Err(e) => {
                error!("Failed to refresh {}: {}", tracked.city, e);
            }
        }

        time::sleep(CITY_PAUSE).await;
    }

    debug!("Tracked city sweep completed");
}
