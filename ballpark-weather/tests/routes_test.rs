use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use ballpark_weather::api_client::ForecastFetcher;
use ballpark_weather::handlers::AppState;
use ballpark_weather::manager::{ForecastCacheManager, RefreshOptions};
use ballpark_weather::registry::{Location, LocationRegistry};
use ballpark_weather::router;
use common::errors::AppError;
use common::models::{ForecastSample, ForecastSet};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// Answers with one sample for positive latitudes and fails otherwise.
struct StubFetcher;

#[async_trait]
impl ForecastFetcher for StubFetcher {
    async fn fetch(&self, latitude: f64, _longitude: f64) -> Result<ForecastSet, AppError> {
        if latitude < 0.0 {
            return Err(AppError::http(500, "provider down"));
        }
        Ok(vec![ForecastSample {
            time: "2025-01-01T09:00:00".to_string(),
            temperature: 5.5,
            weather_description: "clear".to_string(),
            precipitation_probability: 0.3,
            rain_volume_3h: 1.2,
        }])
    }
}

async fn warmed_state() -> AppState {
    let registry = LocationRegistry::new(vec![
        Location {
            name: "서울종합운동장 야구장".to_string(),
            latitude: 37.514086,
            longitude: 127.074722,
        },
        Location {
            name: "Broken Park".to_string(),
            latitude: -1.0,
            longitude: 0.0,
        },
    ])
    .unwrap();

    let manager = Arc::new(ForecastCacheManager::new(
        Arc::new(registry),
        Arc::new(StubFetcher),
        RefreshOptions::default(),
    ));
    manager.refresh_all().await;

    AppState { manager }
}

async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
    let response = router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_forecast_for_known_stadium() {
    let (status, body) = get(
        warmed_state().await,
        "/api/weather/forecast?stadium=%EC%84%9C%EC%9A%B8%EC%A2%85%ED%95%A9%EC%9A%B4%EB%8F%99%EC%9E%A5%20%EC%95%BC%EA%B5%AC%EC%9E%A5",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "time": "2025-01-01T09:00:00",
            "temp": 5.5,
            "weather": "clear",
            "pop": 0.3,
            "rain": 1.2
        }])
    );
}

#[tokio::test]
async fn test_forecast_for_failing_stadium_is_empty_success() {
    let (status, body) = get(warmed_state().await, "/api/weather/forecast?stadium=Broken%20Park").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_forecast_for_unknown_stadium_is_not_found() {
    let (status, body) = get(warmed_state().await, "/api/weather/forecast?stadium=Fenway").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Unknown location: Fenway");
}

#[tokio::test]
async fn test_forecast_without_stadium_param_is_bad_request() {
    let (status, _) = get(warmed_state().await, "/api/weather/forecast").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stadium_list() {
    let (status, body) = get(warmed_state().await, "/api/weather/stadiums").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["Broken Park", "서울종합운동장 야구장"]));
}

#[tokio::test]
async fn test_refresh_status() {
    let (status, body) = get(warmed_state().await, "/api/weather/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "ready");
    assert_eq!(body["total_cycles"], 1);
    assert_eq!(body["skipped_cycles"], 0);

    let locations = body["locations"].as_array().unwrap();
    assert_eq!(locations.len(), 2);
    let broken = locations
        .iter()
        .find(|l| l["name"] == "Broken Park")
        .unwrap();
    assert!(broken["last_result"].as_str().unwrap().starts_with("error:"));
    assert_eq!(broken["sample_count"], 0);
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(warmed_state().await, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "ballpark-weather");
}
