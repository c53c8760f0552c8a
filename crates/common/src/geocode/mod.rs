//! Geocoding adapter (Nominatim wire format)
//!
//! Turns a free-text place into coordinates and back. Misses and transport
//! failures are the same thing to callers: `None`. A story with an
//! unresolvable hometown is still a story.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// A resolved coordinate pair in floating-point degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A reverse-resolved place name
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Trait for geocoding lookups
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Forward lookup: place name to coordinates. `None` covers both
    /// "not found" and any transport or parse failure.
    async fn resolve(&self, city: &str, country: &str) -> Option<Coordinates>;

    /// Reverse lookup: coordinates to place name
    async fn reverse_resolve(&self, latitude: f64, longitude: f64) -> Option<Place>;
}

/// Geocoder speaking the Nominatim HTTP API
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<ReverseAddress>,
}

#[derive(Deserialize, Default)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    country: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(base_url: String, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, reqwest::Error> {
        self.client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .json()
            .await
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, city: &str, country: &str) -> Option<Coordinates> {
        let query = if country.trim().is_empty() {
            city.to_string()
        } else {
            format!("{}, {}", city, country)
        };

        let hits = match self.search(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query = %query, error = %e, "Geocoding request failed, treating as not found");
                return None;
            }
        };

        let hit = hits.into_iter().next()?;

        match (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) {
            (Ok(latitude), Ok(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => {
                warn!(query = %query, "Geocoding response had unparseable coordinates");
                None
            }
        }
    }

    async fn reverse_resolve(&self, latitude: f64, longitude: f64) -> Option<Place> {
        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await;

        let parsed: ReverseResponse = match response {
            Ok(r) => match r.json().await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Reverse geocoding parse failed");
                    return None;
                }
            },
            Err(e) => {
                warn!(error = %e, "Reverse geocoding request failed");
                return None;
            }
        };

        let address = parsed.address?;

        let city = address
            .city
            .or(address.town)
            .or(address.village)
            .or(address.hamlet);

        if city.is_none() && address.country.is_none() {
            return None;
        }

        Some(Place {
            city,
            country: address.country,
        })
    }
}

/// Scripted geocoder for tests; counts calls so callers can assert the
/// empty-city short circuit
pub struct MockGeocoder {
    result: Option<Coordinates>,
    calls: AtomicUsize,
}

impl MockGeocoder {
    /// Always resolves to the given coordinates
    pub fn found(latitude: f64, longitude: f64) -> Self {
        Self {
            result: Some(Coordinates {
                latitude,
                longitude,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Never resolves
    pub fn not_found() -> Self {
        Self {
            result: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn resolve(&self, _city: &str, _country: &str) -> Option<Coordinates> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }

    async fn reverse_resolve(&self, _latitude: f64, _longitude: f64) -> Option<Place> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(Place {
            city: Some("Lagos".to_string()),
            country: Some("Nigeria".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let geocoder = MockGeocoder::found(6.5244, 3.3792);
        assert_eq!(geocoder.call_count(), 0);

        let coords = geocoder.resolve("Lagos", "Nigeria").await;
        assert_eq!(
            coords,
            Some(Coordinates {
                latitude: 6.5244,
                longitude: 3.3792
            })
        );
        assert_eq!(geocoder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_not_found() {
        let geocoder = MockGeocoder::not_found();
        assert!(geocoder.resolve("Atlantis", "").await.is_none());
    }
}
