use axum::{
    extract::{Query, State},
    response::Json,
};
use common::errors::AppError;
use common::models::{ForecastSample, RefreshStatus};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::IntoParams;

use crate::manager::ForecastCacheManager;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ForecastCacheManager>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health check")
    )
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "ballpark-weather" }))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastQuery {
    /// Stadium name as listed by `/api/weather/stadiums`
    pub stadium: String,
}

#[utoipa::path(
    get,
    path = "/api/weather/forecast",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Cached 3-hour forecast samples, possibly empty", body = [ForecastSample]),
        (status = 404, description = "Unknown stadium", body = common::errors::ErrorResponse)
    ),
    tag = "weather"
)]
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<Vec<ForecastSample>>, AppError> {
    info!(stadium = %params.stadium, "Forecast request received");

    let forecast = state.manager.get_forecast(&params.stadium).await?;

    Ok(Json(forecast))
}

#[utoipa::path(
    get,
    path = "/api/weather/stadiums",
    responses(
        (status = 200, description = "Registered stadium names", body = [String])
    ),
    tag = "weather"
)]
pub async fn list_stadiums(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.manager.list_known_locations())
}

#[utoipa::path(
    get,
    path = "/api/weather/status",
    responses(
        (status = 200, description = "Background refresh status", body = RefreshStatus)
    ),
    tag = "weather"
)]
pub async fn refresh_status(State(state): State<AppState>) -> Json<RefreshStatus> {
    Json(state.manager.status().await)
}
