use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One 3-hour forecast bucket as served to clients.
///
/// Wire names follow the ballpark frontend (`temp`, `weather`, `pop`, `rain`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ForecastSample {
    /// Provider-local timestamp, e.g. `2025-06-12T12:00:00`
    pub time: String,
    /// Degrees Celsius
    #[serde(rename = "temp")]
    pub temperature: f64,
    /// Localized condition text
    #[serde(rename = "weather")]
    pub weather_description: String,
    /// Probability of precipitation, 0..=1
    #[serde(rename = "pop")]
    pub precipitation_probability: f64,
    /// Rain volume over the bucket in millimetres
    #[serde(rename = "rain")]
    pub rain_volume_3h: f64,
}

/// Chronologically ordered samples for one location.
pub type ForecastSet = Vec<ForecastSample>;

/// Lifecycle of the forecast cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Uninitialized,
    Warming,
    Ready,
    Refreshing,
}

/// Per-location view of the most recent refresh attempts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationRefreshStatus {
    pub name: String,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// "ok", "error: <reason>" or "pending"
    pub last_result: String,
    pub sample_count: usize,
}

/// Snapshot of the background refresher, exposed by the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshStatus {
    pub state: CacheState,
    pub total_cycles: u64,
    pub skipped_cycles: u64,
    pub last_cycle_started_at: Option<DateTime<Utc>>,
    pub last_cycle_completed_at: Option<DateTime<Utc>>,
    pub last_cycle_duration_ms: Option<u64>,
    pub locations: Vec<LocationRefreshStatus>,
}
