use std::env;

pub const DEFAULT_TRACKED_CITIES: &str = "Delhi:Delhi,Mumbai:Maharashtra,Bengaluru:Karnataka,\
Kolkata:West Bengal,Chennai:Tamil Nadu,Hyderabad:Telangana,Pune:Maharashtra,\
Ahmedabad:Gujarat,Jaipur:Rajasthan,Lucknow:Uttar Pradesh";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub waqi_base_url: String,
    pub waqi_api_key: Option<String>,
    pub openweather_base_url: String,
    pub openweather_api_key: Option<String>,
    pub cpcb_base_url: String,
    pub cpcb_api_key: Option<String>,
    pub cpcb_resource_id: Option<String>,
    pub refresh_interval_minutes: u64,
    pub tracked_cities: Vec<TrackedCity>,
}

/// A city the refresh scheduler keeps warm, with the optional state
/// filter the CPCB portal accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedCity {
    pub city: String,
    pub state: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            waqi_base_url: env::var("WAQI_BASE_URL")
                .unwrap_or_else(|_| "https://api.waqi.info".to_string()),
            waqi_api_key: env::var("WAQI_API_KEY").ok(),
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_api_key: env::var("OPENWEATHER_API_KEY").ok(),
            cpcb_base_url: env::var("CPCB_BASE_URL")
                .unwrap_or_else(|_| "https://api.data.gov.in".to_string()),
            cpcb_api_key: env::var("CPCB_API_KEY").ok(),
            cpcb_resource_id: env::var("CPCB_RESOURCE_ID").ok(),
            refresh_interval_minutes: env::var("REFRESH_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            tracked_cities: parse_tracked_cities(
                &env::var("TRACKED_CITIES").unwrap_or_else(|_| DEFAULT_TRACKED_CITIES.to_string()),
            ),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Parse a comma-separated list of `City` or `City:State` entries.
/// Malformed entries (empty city) are dropped rather than failing startup.
pub fn parse_tracked_cities(raw: &str) -> Vec<TrackedCity> {
    raw.split(',')
        .filter_map(|entry| {
            let mut parts = entry.splitn(2, ':');
            let city = parts.next().unwrap_or("").trim();
            if city.is_empty() {
                return None;
            }
            let state = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            Some(TrackedCity {
                city: city.to_string(),
                state,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tracked_cities() {
        let cities = parse_tracked_cities("Delhi:Delhi, Mumbai:Maharashtra ,Agra");
        assert_eq!(cities.len(), 3);
        assert_eq!(cities[0].city, "Delhi");
        assert_eq!(cities[0].state.as_deref(), Some("Delhi"));
        assert_eq!(cities[1].city, "Mumbai");
        assert_eq!(cities[2].city, "Agra");
        assert_eq!(cities[2].state, None);
    }

    #[test]
    fn test_parse_tracked_cities_skips_empty_entries() {
        let cities = parse_tracked_cities("Delhi:Delhi,, :Kerala,");
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].city, "Delhi");
    }

    #[test]
    fn test_default_tracked_cities_cover_major_metros() {
        let cities = parse_tracked_cities(DEFAULT_TRACKED_CITIES);
        assert_eq!(cities.len(), 10);
        assert!(cities.iter().any(|c| c.city == "Bengaluru"));
        assert!(cities
            .iter()
            .all(|c| c.state.as_deref().is_some_and(|s| !s.is_empty())));
    }
}
