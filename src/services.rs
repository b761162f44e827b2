pub mod aqi_service;
pub mod forecast_service;

pub use aqi_service::{AqiService, LocationQuery, ResolveError};
pub use forecast_service::ForecastService;
