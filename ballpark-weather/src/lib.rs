pub mod api_client;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod manager;
pub mod openapi;
pub mod registry;
pub mod scheduler;

use axum::{Router, routing::get};

/// Routes without CORS or tracing layers; `main` adds those.
pub fn router(state: handlers::AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/weather/forecast", get(handlers::get_forecast))
        .route("/api/weather/stadiums", get(handlers::list_stadiums))
        .route("/api/weather/status", get(handlers::refresh_status))
        .with_state(state)
}
