use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aqi_tracker_service::api::{create_router, AppState};
use aqi_tracker_service::config::Config;
use aqi_tracker_service::db::{HistoryStore, PgHistoryStore};
use aqi_tracker_service::fetchers::{CpcbFetcher, OpenWeatherFetcher, WaqiFetcher};
use aqi_tracker_service::scheduler;
use aqi_tracker_service::services::{AqiService, ForecastService};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,aqi_tracker_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    info!("Starting AQI tracker service with config: {:?}", config);

    // Create database connection pool
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    info!("Database connection established");

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations completed");

    // Create the historical store
    let history: Arc<dyn HistoryStore> = Arc::new(PgHistoryStore::new(pool.clone()));

    // Create provider clients
    let waqi = WaqiFetcher::new(config.waqi_base_url.clone(), config.waqi_api_key.clone());
    let openweather = OpenWeatherFetcher::new(
        config.openweather_base_url.clone(),
        config.openweather_api_key.clone(),
    );
    let cpcb = CpcbFetcher::new(
        config.cpcb_base_url.clone(),
        config.cpcb_api_key.clone(),
        config.cpcb_resource_id.clone(),
    );

    // Create services
    let aqi_service = AqiService::new(waqi, openweather, cpcb, history.clone());
    let forecast_service = ForecastService::new(history);

    // Start background refresh scheduler
    info!("Starting background refresh scheduler");
    let scheduler_service = aqi_service.clone();
    let tracked_cities = config.tracked_cities.clone();
    let interval = config.refresh_interval_minutes;
    tokio::spawn(async move {
        scheduler::start_refresh_scheduler(scheduler_service, tracked_cities, interval).await;
    });

    // Create API router
    let app_state = AppState {
        aqi_service,
        forecast_service,
    };
    let app = create_router(app_state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
