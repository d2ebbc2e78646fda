use crate::errors::AppError;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// HTTP client with a hard per-request timeout.
///
/// Failed requests are reported once and never retried here; callers own any
/// fallback policy.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Fetch and decode a JSON body. Query strings are kept out of logs since
    /// they may carry credentials.
    #[instrument(skip(self, url), fields(host = url.host_str().unwrap_or_default(), path = %url.path()))]
    pub async fn get_json<T>(&self, url: &Url) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.fetch_with_timeout(url).await {
            Ok(body) => {
                debug!("Request successful");
                Ok(body)
            }
            Err(e) => {
                warn!(error = %e, "Request failed");
                Err(e)
            }
        }
    }

    async fn fetch_with_timeout<T>(&self, url: &Url) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let target = redacted(url);

        let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| AppError::timeout(format!("Request to {} timed out", target)))?
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::timeout(format!("Request to {} timed out", target))
                } else {
                    AppError::NetworkError(e.without_url())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http(
                status.as_u16(),
                format!("{} returned {}", target, status),
            ));
        }

        let text = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| AppError::timeout(format!("Reading body from {} timed out", target)))?
            .map_err(|e| AppError::NetworkError(e.without_url()))?;
        let json: T = serde_json::from_str(&text).map_err(AppError::ParseError)?;

        Ok(json)
    }
}

/// Scheme, host and path only.
fn redacted(url: &Url) -> String {
    format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.path()
    )
}
