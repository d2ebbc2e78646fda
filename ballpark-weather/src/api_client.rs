use async_trait::async_trait;
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::{ForecastSample, ForecastSet};
use reqwest::Url;
use serde::Deserialize;
use tracing::{info, instrument};

/// Source of raw forecasts for a coordinate pair.
#[async_trait]
pub trait ForecastFetcher: Send + Sync {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<ForecastSet, AppError>;
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    list: Option<Vec<OwmEntry>>,
    message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OwmEntry {
    dt_txt: String,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    pop: Option<f64>,
    rain: Option<OwmRain>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmRain {
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

/// Query parameters that stay fixed for every request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub api_key: String,
    pub units: String,
    pub lang: String,
}

pub struct OpenWeatherMapClient {
    http_client: HttpClient,
    base_url: Url,
    options: RequestOptions,
}

impl OpenWeatherMapClient {
    pub fn new(
        http_client: HttpClient,
        base_url: &str,
        options: RequestOptions,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::config(format!("Invalid forecast URL {}: {}", base_url, e)))?;

        Ok(Self {
            http_client,
            base_url,
            options,
        })
    }

    fn forecast_url(&self, latitude: f64, longitude: f64) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string())
            .append_pair("units", &self.options.units)
            .append_pair("appid", &self.options.api_key)
            .append_pair("lang", &self.options.lang);
        url
    }
}

#[async_trait]
impl ForecastFetcher for OpenWeatherMapClient {
    #[instrument(skip(self))]
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<ForecastSet, AppError> {
        let url = self.forecast_url(latitude, longitude);
        let response: OwmForecastResponse = self.http_client.get_json(&url).await?;
        let samples = into_forecast_set(response)?;

        info!(samples = samples.len(), "Fetched forecast from provider");

        Ok(samples)
    }
}

/// Decode a raw provider body into domain samples.
pub fn parse_forecast(body: &str) -> Result<ForecastSet, AppError> {
    let response: OwmForecastResponse = serde_json::from_str(body)?;
    into_forecast_set(response)
}

fn into_forecast_set(response: OwmForecastResponse) -> Result<ForecastSet, AppError> {
    let Some(list) = response.list else {
        let detail = response
            .message
            .map(|m| format!(" (provider message: {})", m))
            .unwrap_or_default();
        return Err(AppError::unexpected_payload(format!(
            "response has no `list` field{}",
            detail
        )));
    };

    list.into_iter().map(into_sample).collect()
}

fn into_sample(entry: OwmEntry) -> Result<ForecastSample, AppError> {
    let weather_description = entry
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .ok_or_else(|| {
            AppError::unexpected_payload(format!(
                "entry {} has no weather condition",
                entry.dt_txt
            ))
        })?;

    Ok(ForecastSample {
        time: normalize_timestamp(&entry.dt_txt),
        temperature: entry.main.temp,
        weather_description,
        precipitation_probability: entry.pop.unwrap_or(0.0),
        rain_volume_3h: entry.rain.and_then(|r| r.three_hours).unwrap_or(0.0),
    })
}

/// `2025-06-12 12:00:00` → `2025-06-12T12:00:00`. No timezone conversion.
pub fn normalize_timestamp(dt_txt: &str) -> String {
    dt_txt.replacen(' ', "T", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn client(base_url: &str) -> OpenWeatherMapClient {
        OpenWeatherMapClient::new(
            HttpClient::new(Duration::from_secs(1)).unwrap(),
            base_url,
            RequestOptions {
                api_key: "test-key".to_string(),
                units: "metric".to_string(),
                lang: "kr".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(normalize_timestamp("2025-06-12 12:00:00"), "2025-06-12T12:00:00");
    }

    #[test]
    fn test_normalize_timestamp_already_iso() {
        assert_eq!(normalize_timestamp("2025-06-12T12:00:00"), "2025-06-12T12:00:00");
    }

    #[test]
    fn test_parse_forecast_full_entry() {
        let body = json!({
            "cod": "200",
            "list": [
                {
                    "dt": 1749729600,
                    "dt_txt": "2025-06-12 12:00:00",
                    "main": { "temp": 24.3, "humidity": 61 },
                    "weather": [
                        { "id": 500, "description": "실 비" },
                        { "id": 701, "description": "박무" }
                    ],
                    "pop": 0.42,
                    "rain": { "3h": 1.27 }
                }
            ]
        })
        .to_string();

        let samples = parse_forecast(&body).unwrap();
        assert_eq!(
            samples,
            vec![ForecastSample {
                time: "2025-06-12T12:00:00".to_string(),
                temperature: 24.3,
                weather_description: "실 비".to_string(),
                precipitation_probability: 0.42,
                rain_volume_3h: 1.27,
            }]
        );
    }

    #[test]
    fn test_parse_forecast_defaults_missing_pop_and_rain() {
        let body = json!({
            "list": [
                {
                    "dt_txt": "2025-01-01 09:00:00",
                    "main": { "temp": 5.5 },
                    "weather": [{ "description": "clear" }]
                },
                {
                    "dt_txt": "2025-01-01 12:00:00",
                    "main": { "temp": 7.0 },
                    "weather": [{ "description": "clouds" }],
                    "rain": {}
                }
            ]
        })
        .to_string();

        let samples = parse_forecast(&body).unwrap();
        assert_eq!(samples.len(), 2);
        for sample in &samples {
            assert_eq!(sample.precipitation_probability, 0.0);
            assert_eq!(sample.rain_volume_3h, 0.0);
        }
    }

    #[test]
    fn test_parse_forecast_preserves_order() {
        let body = json!({
            "list": [
                { "dt_txt": "2025-01-01 09:00:00", "main": { "temp": 1.0 }, "weather": [{ "description": "a" }] },
                { "dt_txt": "2025-01-01 12:00:00", "main": { "temp": 2.0 }, "weather": [{ "description": "b" }] },
                { "dt_txt": "2025-01-01 15:00:00", "main": { "temp": 3.0 }, "weather": [{ "description": "c" }] }
            ]
        })
        .to_string();

        let times: Vec<_> = parse_forecast(&body)
            .unwrap()
            .into_iter()
            .map(|s| s.time)
            .collect();
        assert_eq!(
            times,
            vec!["2025-01-01T09:00:00", "2025-01-01T12:00:00", "2025-01-01T15:00:00"]
        );
    }

    #[test]
    fn test_parse_forecast_missing_list() {
        let body = json!({ "cod": "400", "message": "wrong latitude" }).to_string();
        let err = parse_forecast(&body).unwrap_err();
        assert!(matches!(err, AppError::UnexpectedPayload(_)));
        assert!(err.to_string().contains("wrong latitude"));
    }

    #[test]
    fn test_parse_forecast_empty_list_is_empty_set() {
        let samples = parse_forecast(r#"{"list": []}"#).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_parse_forecast_empty_weather_array() {
        let body = json!({
            "list": [{ "dt_txt": "2025-01-01 09:00:00", "main": { "temp": 5.5 }, "weather": [] }]
        })
        .to_string();
        assert!(matches!(
            parse_forecast(&body),
            Err(AppError::UnexpectedPayload(_))
        ));
    }

    #[test]
    fn test_parse_forecast_not_json() {
        assert!(matches!(
            parse_forecast("Service Unavailable"),
            Err(AppError::ParseError(_))
        ));
    }

    #[test]
    fn test_forecast_url_carries_fixed_parameters() {
        let url =
            client("https://api.openweathermap.org/data/2.5/forecast").forecast_url(36.3, 127.4);
        assert_eq!(
            url.as_str(),
            "https://api.openweathermap.org/data/2.5/forecast?lat=36.3&lon=127.4&units=metric&appid=test-key&lang=kr"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = OpenWeatherMapClient::new(
            HttpClient::new(Duration::from_secs(1)).unwrap(),
            "not a url",
            RequestOptions {
                api_key: "k".to_string(),
                units: "metric".to_string(),
                lang: "kr".to_string(),
            },
        );
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
