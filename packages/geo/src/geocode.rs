//! Address geocoding.
//!
//! The engine resolves free-form addresses through a [`ChainGeocoder`]:
//!
//! 1. **Google Geocoding API** when an API key is configured.
//! 2. **Gazetteer** of neighborhood centroids for the active city (exact
//!    case-insensitive substring match, no network).
//!
//! Providers are tried in order; errors are logged and the next provider is
//! tried. An address nobody can resolve yields `None`, and the caller falls
//! back to ZIP and area filtering.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::{GeoPoint, haversine_miles};

/// Google Geocoding API endpoint.
pub const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Errors that can occur during geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The provider is throttling us.
    #[error("Rate limited by geocoding provider")]
    RateLimited,
}

/// Resolves a free-form address to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Provider name for log messages.
    fn name(&self) -> &str;

    /// Geocodes `address`. `Ok(None)` means the provider found no match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider could not be queried or its
    /// response could not be understood.
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}

// ── Google ───────────────────────────────────────────────────────────────

/// Google Geocoding API client.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    /// Creates a client for the public Google endpoint.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: GOOGLE_GEOCODE_URL.to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    fn name(&self) -> &str {
        "google"
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_google_response(&body)
    }
}

/// Parses a Google Geocoding API response.
fn parse_google_response(body: &serde_json::Value) -> Result<Option<GeoPoint>, GeocodeError> {
    let status = body["status"].as_str().ok_or_else(|| GeocodeError::Parse {
        message: "Google response has no status".to_string(),
    })?;

    match status {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        "OVER_QUERY_LIMIT" => return Err(GeocodeError::RateLimited),
        other => {
            return Err(GeocodeError::Parse {
                message: format!("Google geocoding status {other}"),
            });
        }
    }

    let Some(first) = body["results"].as_array().and_then(|r| r.first()) else {
        return Ok(None);
    };

    let location = &first["geometry"]["location"];
    let lat = location["lat"].as_f64().ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Google response".to_string(),
    })?;
    let lng = location["lng"].as_f64().ok_or_else(|| GeocodeError::Parse {
        message: "Missing lng in Google response".to_string(),
    })?;

    Ok(Some(GeoPoint::new(lat, lng)))
}

// ── Gazetteer ────────────────────────────────────────────────────────────

/// A named place with a representative coordinate.
#[derive(Debug, Clone, Deserialize)]
pub struct GazetteerEntry {
    /// Place name matched against addresses (e.g., `"pacific heights"`).
    pub name: String,
    /// Centroid latitude.
    pub latitude: f64,
    /// Centroid longitude.
    pub longitude: f64,
}

/// Offline geocoder over a fixed list of neighborhood centroids.
///
/// An address matches the first entry whose name it contains
/// (case-insensitively). Addresses that mention no known place resolve to
/// `None` rather than to a city-wide default.
pub struct GazetteerGeocoder {
    entries: Vec<GazetteerEntry>,
}

impl GazetteerGeocoder {
    /// Creates a gazetteer over `entries`, matched in the given order.
    #[must_use]
    pub const fn new(entries: Vec<GazetteerEntry>) -> Self {
        Self { entries }
    }

    /// Looks up `address` without going through the async trait.
    #[must_use]
    pub fn lookup(&self, address: &str) -> Option<GeoPoint> {
        let haystack = address.to_lowercase();
        self.entries
            .iter()
            .find(|e| haystack.contains(&e.name.to_lowercase()))
            .map(|e| {
                log::info!("Using gazetteer coordinates for {}", e.name);
                GeoPoint::new(e.latitude, e.longitude)
            })
    }
}

#[async_trait]
impl Geocoder for GazetteerGeocoder {
    fn name(&self) -> &str {
        "gazetteer"
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        Ok(self.lookup(address))
    }
}

/// Returns the entry whose centroid is closest to `point`, provided it lies
/// within `max_miles`.
#[must_use]
pub fn nearest_entry(
    entries: &[GazetteerEntry],
    point: GeoPoint,
    max_miles: f64,
) -> Option<&GazetteerEntry> {
    entries
        .iter()
        .map(|e| {
            let distance = haversine_miles(point, GeoPoint::new(e.latitude, e.longitude));
            (e, distance)
        })
        .filter(|(_, distance)| *distance <= max_miles)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(e, _)| e)
}

// ── Chain ────────────────────────────────────────────────────────────────

/// Tries each geocoder in order and returns the first match.
pub struct ChainGeocoder {
    geocoders: Vec<Box<dyn Geocoder>>,
}

impl ChainGeocoder {
    /// Creates a chain from providers in priority order.
    #[must_use]
    pub fn new(geocoders: Vec<Box<dyn Geocoder>>) -> Self {
        Self { geocoders }
    }
}

#[async_trait]
impl Geocoder for ChainGeocoder {
    fn name(&self) -> &str {
        "chain"
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        for geocoder in &self.geocoders {
            match geocoder.geocode(address).await {
                Ok(Some(point)) => return Ok(Some(point)),
                Ok(None) => {
                    log::debug!("{}: no match for '{address}'", geocoder.name());
                }
                Err(e) => {
                    log::warn!("{}: geocoding '{address}' failed: {e}", geocoder.name());
                }
            }
        }
        Ok(None)
    }
}
