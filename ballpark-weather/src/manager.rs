use chrono::Utc;
use common::errors::AppError;
use common::models::{CacheState, ForecastSet, LocationRefreshStatus, RefreshStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::time::timeout;
use tracing::{Instrument, error, info, instrument, warn};

use crate::api_client::ForecastFetcher;
use crate::cache::{CachedForecast, ForecastCache};
use crate::registry::{Location, LocationRegistry};

/// Tuning for a refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Upper bound on in-flight provider calls
    pub max_concurrent_fetches: usize,
    /// Hard cap on one location's fetch, on top of the HTTP client timeout
    pub fetch_timeout: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 4,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Summary of one `refresh_all` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// The call found another cycle in flight and did nothing
    pub skipped_overlap: bool,
}

impl RefreshOutcome {
    pub fn skipped() -> Self {
        Self {
            skipped_overlap: true,
            ..Self::default()
        }
    }
}

struct LocationResult {
    name: String,
    attempted_at: chrono::DateTime<Utc>,
    result: Result<usize, String>,
}

pub struct ForecastCacheManager {
    registry: Arc<LocationRegistry>,
    fetcher: Arc<dyn ForecastFetcher>,
    cache: Arc<ForecastCache>,
    status: Arc<RwLock<RefreshStatus>>,
    refresh_guard: Mutex<()>,
    semaphore: Arc<Semaphore>,
    fetch_timeout: Duration,
}

impl ForecastCacheManager {
    pub fn new(
        registry: Arc<LocationRegistry>,
        fetcher: Arc<dyn ForecastFetcher>,
        options: RefreshOptions,
    ) -> Self {
        let locations = registry
            .list_locations()
            .map(|location| LocationRefreshStatus {
                name: location.name.clone(),
                last_success_at: None,
                last_attempt_at: None,
                last_result: "pending".to_string(),
                sample_count: 0,
            })
            .collect();

        let status = RefreshStatus {
            state: CacheState::Uninitialized,
            total_cycles: 0,
            skipped_cycles: 0,
            last_cycle_started_at: None,
            last_cycle_completed_at: None,
            last_cycle_duration_ms: None,
            locations,
        };

        Self {
            registry,
            fetcher,
            cache: Arc::new(ForecastCache::new()),
            status: Arc::new(RwLock::new(status)),
            refresh_guard: Mutex::new(()),
            semaphore: Arc::new(Semaphore::new(options.max_concurrent_fetches.max(1))),
            fetch_timeout: options.fetch_timeout,
        }
    }

    /// Fetch every registered location and replace the entries that succeed.
    ///
    /// Returns immediately with [`RefreshOutcome::skipped`] if another cycle is
    /// still running.
    #[instrument(skip(self), fields(location_count = self.registry.len()))]
    pub async fn refresh_all(&self) -> RefreshOutcome {
        let Ok(_running) = self.refresh_guard.try_lock() else {
            let mut status = self.status.write().await;
            status.skipped_cycles += 1;
            warn!("Previous refresh cycle still running, skipping");
            return RefreshOutcome::skipped();
        };

        let started = Instant::now();
        {
            let mut status = self.status.write().await;
            status.state = match status.state {
                CacheState::Uninitialized | CacheState::Warming => CacheState::Warming,
                CacheState::Ready | CacheState::Refreshing => CacheState::Refreshing,
            };
            status.last_cycle_started_at = Some(Utc::now());
        }

        info!("Refreshing forecasts for all locations");

        let mut handles = Vec::with_capacity(self.registry.len());
        for location in self.registry.list_locations() {
            let handle = tokio::spawn(
                refresh_location(
                    location.clone(),
                    self.fetcher.clone(),
                    self.cache.clone(),
                    self.semaphore.clone(),
                    self.fetch_timeout,
                )
                .in_current_span(),
            );
            handles.push((location.name.clone(), handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(location = %name, error = %e, "Refresh task join error");
                    results.push(LocationResult {
                        name,
                        attempted_at: Utc::now(),
                        result: Err(format!("task failed: {}", e)),
                    });
                }
            }
        }

        let outcome = self.record_cycle(results, started).await;

        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Refresh cycle completed"
        );

        outcome
    }

    async fn record_cycle(&self, results: Vec<LocationResult>, started: Instant) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();
        let mut status = self.status.write().await;

        for result in results {
            let Some(entry) = status.locations.iter_mut().find(|l| l.name == result.name) else {
                continue;
            };
            entry.last_attempt_at = Some(result.attempted_at);
            match result.result {
                Ok(sample_count) => {
                    outcome.succeeded += 1;
                    entry.last_success_at = Some(result.attempted_at);
                    entry.last_result = "ok".to_string();
                    entry.sample_count = sample_count;
                }
                Err(reason) => {
                    outcome.failed += 1;
                    entry.last_result = format!("error: {}", reason);
                }
            }
        }

        status.state = CacheState::Ready;
        status.total_cycles += 1;
        status.last_cycle_completed_at = Some(Utc::now());
        status.last_cycle_duration_ms = Some(started.elapsed().as_millis() as u64);

        outcome
    }

    /// Cached samples for a registered location, empty if none have landed yet.
    pub async fn get_forecast(&self, name: &str) -> Result<ForecastSet, AppError> {
        if !self.registry.contains(name) {
            return Err(AppError::unknown_location(name));
        }

        Ok(self
            .cache
            .get(name)
            .await
            .map(|entry| entry.data)
            .unwrap_or_default())
    }

    pub fn list_known_locations(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Cache entry with its fetch time, `None` until a fetch has succeeded.
    pub async fn cached(&self, name: &str) -> Option<CachedForecast> {
        self.cache.get(name).await
    }

    pub async fn status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }

    pub async fn state(&self) -> CacheState {
        self.status.read().await.state
    }
}

async fn refresh_location(
    location: Location,
    fetcher: Arc<dyn ForecastFetcher>,
    cache: Arc<ForecastCache>,
    semaphore: Arc<Semaphore>,
    fetch_timeout: Duration,
) -> LocationResult {
    let name = location.name;

    let _permit = match semaphore.acquire().await {
        Ok(p) => p,
        Err(_) => {
            return LocationResult {
                name,
                attempted_at: Utc::now(),
                result: Err("semaphore closed".to_string()),
            };
        }
    };

    let fetched = timeout(
        fetch_timeout,
        fetcher.fetch(location.latitude, location.longitude),
    )
    .await
    .unwrap_or_else(|_| Err(AppError::timeout(format!("Forecast fetch for {} timed out", name))));

    let attempted_at = Utc::now();
    let result = match fetched {
        Ok(samples) => {
            let count = samples.len();
            cache.set(name.clone(), samples, attempted_at).await;
            info!(location = %name, samples = count, "Location cached");
            Ok(count)
        }
        Err(e) if e.is_fetch_error() => {
            warn!(location = %name, error = %e, "Forecast fetch failed, keeping previous entry");
            Err(e.to_string())
        }
        Err(e) => {
            error!(location = %name, error = %e, "Forecast fetcher misbehaved, keeping previous entry");
            Err(e.to_string())
        }
    };

    LocationResult {
        name,
        attempted_at,
        result,
    }
}
