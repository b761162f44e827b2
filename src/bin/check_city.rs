use std::env;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use aqi_tracker_service::aqi;
use aqi_tracker_service::db::{HistoryStore, PgHistoryStore};
use aqi_tracker_service::fetchers::{CpcbFetcher, OpenWeatherFetcher, WaqiFetcher};
use aqi_tracker_service::services::{AqiService, LocationQuery};

#[derive(Parser)]
#[command(name = "check-city")]
#[command(about = "Resolve a current AQI reading for a city against the live providers", long_about = None)]
struct Cli {
    /// City to resolve
    city: String,

    /// State filter for the CPCB portal
    #[arg(long)]
    state: Option<String>,

    /// Latitude for the OpenWeatherMap fallback
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude for the OpenWeatherMap fallback
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Database connection string
    #[arg(long, env)]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cli.database_url)
        .await?;

    let history: Arc<dyn HistoryStore> = Arc::new(PgHistoryStore::new(pool));
    let waqi = WaqiFetcher::new(
        env::var("WAQI_BASE_URL").unwrap_or_else(|_| "https://api.waqi.info".to_string()),
        env::var("WAQI_API_KEY").ok(),
    );
    let openweather = OpenWeatherFetcher::new(
        env::var("OPENWEATHER_BASE_URL")
            .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
        env::var("OPENWEATHER_API_KEY").ok(),
    );
    let cpcb = CpcbFetcher::new(
        env::var("CPCB_BASE_URL").unwrap_or_else(|_| "https://api.data.gov.in".to_string()),
        env::var("CPCB_API_KEY").ok(),
        env::var("CPCB_RESOURCE_ID").ok(),
    );

    let service = AqiService::new(waqi, openweather, cpcb, history);

    println!("Resolving AQI for {}...\n", cli.city);

    let query = LocationQuery {
        city: Some(cli.city.clone()),
        state: cli.state.clone(),
        lat: cli.lat,
        lon: cli.lon,
    };
    let reading = service.resolve(&query).await?;

    println!("City:    {}", reading.city);
    if let Some(state) = &reading.state {
        println!("State:   {}", state);
    }
    println!("Station: {}", reading.station);
    println!("AQI:     {} ({})", reading.aqi, aqi::category(reading.aqi));
    println!("PM2.5:   {} µg/m³", reading.pollutants.pm25);
    println!("PM10:    {} µg/m³", reading.pollutants.pm10);
    println!("NO2:     {} µg/m³", reading.pollutants.no2);
    println!("SO2:     {} µg/m³", reading.pollutants.so2);
    println!("CO:      {}", reading.pollutants.co);
    println!("O3:      {} µg/m³", reading.pollutants.o3);
    println!("Source:  {}", reading.source);
    println!("Updated: {}", reading.recorded_at);

    Ok(())
}
