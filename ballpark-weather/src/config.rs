use common::errors::AppError;
use std::env;
use std::time::Duration;

pub const DEFAULT_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

pub struct Config {
    pub port: u16,
    pub forecast_url: String,
    pub api_key: String,
    pub units: String,
    pub lang: String,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub max_concurrent_fetches: usize,
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, so tests don't touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENWEATHERMAP_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::config("OPENWEATHERMAP_API_KEY must be set"))?;

        let refresh_interval_secs: u64 = lookup("REFRESH_INTERVAL_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30 * 60);
        if refresh_interval_secs == 0 {
            return Err(AppError::config("REFRESH_INTERVAL_SECONDS must be positive"));
        }

        Ok(Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            forecast_url: lookup("OPENWEATHERMAP_URL")
                .unwrap_or_else(|| DEFAULT_FORECAST_URL.to_string()),
            api_key,
            units: lookup("FORECAST_UNITS").unwrap_or_else(|| "metric".to_string()),
            lang: lookup("FORECAST_LANG").unwrap_or_else(|| "kr".to_string()),
            refresh_interval: Duration::from_secs(refresh_interval_secs),
            request_timeout: Duration::from_secs(
                lookup("REQUEST_TIMEOUT_SECONDS")
                    .and_then(|s| s.parse().ok())
                    .filter(|&s: &u64| s > 0)
                    .unwrap_or(5),
            ),
            max_concurrent_fetches: lookup("MAX_CONCURRENT_FETCHES")
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(4),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}
