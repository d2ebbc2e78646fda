use chrono::{DateTime, Utc};
use common::models::ForecastSet;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest successful forecast for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedForecast {
    pub data: ForecastSet,
    /// Completion time of the fetch that produced `data`
    pub fetched_at: DateTime<Utc>,
}

/// Location name → latest forecast. Entries are replaced whole, never edited
/// in place, so readers see either the old set or the new one.
pub struct ForecastCache {
    cache: Arc<RwLock<HashMap<String, CachedForecast>>>,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, name: &str) -> Option<CachedForecast> {
        let cache = self.cache.read().await;
        cache.get(name).cloned()
    }

    pub async fn set(&self, name: String, data: ForecastSet, fetched_at: DateTime<Utc>) {
        let entry = CachedForecast { data, fetched_at };
        let mut cache = self.cache.write().await;
        cache.insert(name, entry);
    }

}

impl Default for ForecastCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::ForecastSample;

    fn sample(time: &str, temperature: f64) -> ForecastSample {
        ForecastSample {
            time: time.to_string(),
            temperature,
            weather_description: "맑음".to_string(),
            precipitation_probability: 0.0,
            rain_volume_3h: 0.0,
        }
    }

    #[tokio::test]
    async fn empty_cache_has_no_entries() {
        let cache = ForecastCache::new();
        assert!(cache.get("고척스카이돔").await.is_none());
    }

    #[tokio::test]
    async fn set_replaces_whole_entry() {
        let cache = ForecastCache::new();
        let first_at = Utc::now();
        cache
            .set(
                "StadiumA".to_string(),
                vec![sample("2025-01-01T09:00:00", 1.0), sample("2025-01-01T12:00:00", 2.0)],
                first_at,
            )
            .await;

        let second_at = first_at + chrono::Duration::minutes(30);
        cache
            .set(
                "StadiumA".to_string(),
                vec![sample("2025-01-01T12:00:00", 3.0)],
                second_at,
            )
            .await;

        let entry = cache.get("StadiumA").await.unwrap();
        assert_eq!(entry.data, vec![sample("2025-01-01T12:00:00", 3.0)]);
        assert_eq!(entry.fetched_at, second_at);
    }
}
