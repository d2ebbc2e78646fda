use common::errors::AppError;
use std::collections::BTreeMap;

/// A named point the cache keeps forecasts for.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

const KBO_BALLPARKS: [(&str, f64, f64); 9] = [
    ("대전한화생명볼파크", 36.317085, 127.429131),
    ("대구삼성라이온즈파크", 35.841993, 128.681336),
    ("서울종합운동장 야구장", 37.514086, 127.074722),
    ("고척스카이돔", 37.498108, 126.867548),
    ("수원KT위즈파크", 37.2996, 127.0095),
    ("부산사직구장", 35.194398, 129.061261),
    ("창원NC파크", 35.222488, 128.583033),
    ("광주기아챔피언스필드", 35.1683, 126.8888),
    ("인천SSG랜더스필드", 37.435057, 126.693137),
];

/// Immutable name → coordinates mapping, built once at startup.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    locations: BTreeMap<String, Location>,
}

impl LocationRegistry {
    /// Build a registry from an explicit list. Duplicate names are rejected.
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Result<Self, AppError> {
        let mut map = BTreeMap::new();
        for location in locations {
            if map.contains_key(&location.name) {
                return Err(AppError::config(format!(
                    "Duplicate location name in registry: {}",
                    location.name
                )));
            }
            map.insert(location.name.clone(), location);
        }
        Ok(Self { locations: map })
    }

    /// The nine KBO home ballparks.
    pub fn kbo_ballparks() -> Self {
        let locations = KBO_BALLPARKS
            .iter()
            .map(|&(name, latitude, longitude)| {
                (
                    name.to_string(),
                    Location {
                        name: name.to_string(),
                        latitude,
                        longitude,
                    },
                )
            })
            .collect();
        Self { locations }
    }

    pub fn list_locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.locations.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl Default for LocationRegistry {
    fn default() -> Self {
        Self::kbo_ballparks()
    }
}
