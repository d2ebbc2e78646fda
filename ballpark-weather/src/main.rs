use axum::http::{HeaderValue, Method};
use ballpark_weather::api_client::{OpenWeatherMapClient, RequestOptions};
use ballpark_weather::config::Config;
use ballpark_weather::handlers::AppState;
use ballpark_weather::manager::{ForecastCacheManager, RefreshOptions};
use ballpark_weather::registry::LocationRegistry;
use ballpark_weather::{openapi, router, scheduler};
use common::errors::AppError;
use common::http_client::HttpClient;
use common::tracing::{init_tracing, init_tracing_pretty};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    const LOG_DIRECTIVE: &str = "ballpark_weather=info,common=info,tower_http=info";
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => init_tracing(LOG_DIRECTIVE),
        _ => init_tracing_pretty(LOG_DIRECTIVE),
    }

    let config = Config::from_env()?;
    let cancellation_token = CancellationToken::new();

    let registry = Arc::new(LocationRegistry::kbo_ballparks());
    let fetcher = Arc::new(OpenWeatherMapClient::new(
        HttpClient::new(config.request_timeout)?,
        &config.forecast_url,
        RequestOptions {
            api_key: config.api_key.clone(),
            units: config.units.clone(),
            lang: config.lang.clone(),
        },
    )?);
    let manager = Arc::new(ForecastCacheManager::new(
        registry.clone(),
        fetcher,
        RefreshOptions {
            max_concurrent_fetches: config.max_concurrent_fetches,
            fetch_timeout: config.request_timeout * 2,
        },
    ));

    info!(
        stadiums = registry.len(),
        interval_secs = config.refresh_interval.as_secs(),
        "Starting forecast refresher"
    );
    let (_, refresher) = scheduler::start(
        manager.clone(),
        config.refresh_interval,
        cancellation_token.clone(),
    )
    .await;

    let app = router(AppState { manager })
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Ballpark weather service starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancellation_token))
        .await?;

    if let Err(e) = refresher.await {
        error!(error = %e, "Forecast refresher task failed");
    }

    info!("Ballpark weather service stopped");
    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, AppError> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| AppError::config(format!("Invalid origin {}: {}", origin, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET]))
}

async fn shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }

    // Stop scheduling refresh cycles
    cancellation_token.cancel();
    warn!("Cancelled forecast refresher, shutting down gracefully...");
}
