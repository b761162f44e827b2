use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::db::{ForecastEntry, ForecastResponse};
use crate::fetchers::{AqiReading, Pollutants, Source};
use crate::services::{AqiService, ForecastService, LocationQuery, ResolveError};

#[derive(Clone)]
pub struct AppState {
    pub aqi_service: AqiService,
    pub forecast_service: ForecastService,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastParams {
    pub city: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/aqi/current", get(get_current))
        .route("/aqi/forecast", get(get_forecast))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[derive(OpenApi)]
#[openapi(
    paths(health, get_current, get_forecast),
    components(schemas(
        HealthResponse,
        AqiReading,
        Pollutants,
        Source,
        ForecastResponse,
        ForecastEntry
    )),
    tags((name = "aqi", description = "Air quality resolution and forecasting"))
)]
struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

fn resolve_error_status(error: &ResolveError) -> StatusCode {
    match error {
        ResolveError::InvalidLocation => {
            warn!("Rejected request: {}", error);
            StatusCode::BAD_REQUEST
        }
        ResolveError::NoDataAvailable(_) => {
            warn!("{}", error);
            StatusCode::NOT_FOUND
        }
        ResolveError::Db(e) => {
            error!("Historical store failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "aqi",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/aqi/current",
    tag = "aqi",
    params(LocationQuery),
    responses(
        (status = 200, description = "Resolved reading", body = AqiReading),
        (status = 400, description = "Neither a city nor a lat/lon pair was supplied"),
        (status = 404, description = "All sources and the historical store are exhausted"),
        (status = 500, description = "Historical store failure")
    )
)]
#[instrument(skip(state, params), fields(city = ?params.city, lat = ?params.lat, lon = ?params.lon))]
async fn get_current(
    State(state): State<AppState>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<AqiReading>, StatusCode> {
    debug!("Resolving current AQI");
    let reading = state
        .aqi_service
        .resolve(&params)
        .await
        .map_err(|e| resolve_error_status(&e))?;

    info!(
        "Resolved AQI {} for {} via {}",
        reading.aqi, reading.city, reading.source
    );

    Ok(Json(reading))
}

#[utoipa::path(
    get,
    path = "/api/v1/aqi/forecast",
    tag = "aqi",
    params(ForecastParams),
    responses(
        (status = 200, description = "24-hour forecast", body = ForecastResponse),
        (status = 400, description = "No city was supplied"),
        (status = 404, description = "No history exists for the city"),
        (status = 500, description = "Historical store failure")
    )
)]
#[instrument(skip(state, params), fields(city = ?params.city))]
async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> Result<Json<ForecastResponse>, StatusCode> {
    let city = params.city.as_deref().unwrap_or_default();
    debug!("Generating forecast for {}", city);

    let response = state
        .forecast_service
        .forecast(city)
        .await
        .map_err(|e| resolve_error_status(&e))?;

    info!(
        "Generated forecast for {} with {} entries",
        response.city,
        response.forecast.len()
    );

    Ok(Json(response))
}
