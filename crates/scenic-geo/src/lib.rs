//! # scenic-geo
//!
//! Best-effort reverse geocoding for search-result presentation.
//!
//! Turns (latitude, longitude) pairs into human-readable addresses via the
//! Nominatim `/reverse` endpoint. This crate is a presentation-side
//! collaborator: the index/query core never depends on it, and a failed
//! lookup is a missing address, never a failed search.
//!
//! Two guards keep the external service happy:
//!
//! - **Cache**: coordinates are rounded to ~1e-5 degrees (about a meter) and
//!   each rounded key is looked up at most once per process.
//! - **Throttle**: outbound requests are spaced by a minimum interval
//!   (Nominatim's usage policy asks for at most one request per second).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Result type alias for scenic-geo operations.
pub type GeoResult<T> = Result<T, GeoError>;

/// Errors that can occur during reverse geocoding.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The HTTP request failed (network, timeout, non-2xx status).
    #[error("Geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with something that is not a geocoding response.
    #[error("Geocoding response invalid: {message}")]
    InvalidResponse { message: String },
}

// ============================================================================
// GeocodeConfig
// ============================================================================

/// Configuration for the reverse geocoder.
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    /// Base URL of the Nominatim-compatible service.
    pub endpoint: String,

    /// User-Agent header; Nominatim requires an identifying one.
    pub user_agent: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Minimum spacing between outbound requests.
    pub min_interval: Duration,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("scenic/{} (reverse-image-search)", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(10),
            min_interval: Duration::from_millis(1100),
        }
    }
}

// ============================================================================
// ReverseGeocoder
// ============================================================================

/// Coordinates rounded to 1e-5 degrees; cache granularity.
type CacheKey = (i64, i64);

#[derive(Default)]
struct GeocoderState {
    cache: HashMap<CacheKey, Option<String>>,
    last_request: Option<Instant>,
}

/// Cached, throttled reverse-geocoding client.
pub struct ReverseGeocoder {
    http: reqwest::blocking::Client,
    endpoint: String,
    min_interval: Duration,
    state: Mutex<GeocoderState>,
}

impl std::fmt::Debug for ReverseGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseGeocoder")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ReverseGeocoder {
    /// Create a geocoder from configuration.
    pub fn new(config: GeocodeConfig) -> GeoResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            min_interval: config.min_interval,
            state: Mutex::new(GeocoderState::default()),
        })
    }

    /// Create a geocoder with the default Nominatim configuration.
    pub fn with_defaults() -> GeoResult<Self> {
        Self::new(GeocodeConfig::default())
    }

    /// Resolve coordinates to an address.
    ///
    /// Returns `Ok(None)` when the service cannot geocode the location
    /// (open ocean, for instance). Cached results never hit the network
    /// again, including negative ones.
    pub fn reverse(&self, latitude: f64, longitude: f64) -> GeoResult<Option<String>> {
        let key = cache_key(latitude, longitude);
        {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = state.cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        self.throttle();

        let url = format!(
            "{}/reverse?format=jsonv2&lat={latitude}&lon={longitude}",
            self.endpoint
        );
        debug!("Reverse geocoding {latitude}, {longitude}");
        let body = self.http.get(&url).send()?.error_for_status()?.text()?;
        let address = parse_display_name(&body)?;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.cache.insert(key, address.clone());
        Ok(address)
    }

    /// Number of cached lookups (positive and negative).
    pub fn cached_lookups(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cache
            .len()
    }

    /// Sleep as needed to keep requests `min_interval` apart.
    ///
    /// The lock is held across the sleep so concurrent callers serialize;
    /// politeness towards the shared service matters more than latency here.
    fn throttle(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = state.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        state.last_request = Some(Instant::now());
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Round coordinates to ~1e-5 degrees for cache keying.
fn cache_key(latitude: f64, longitude: f64) -> CacheKey {
    (
        (latitude * 1e5).round() as i64,
        (longitude * 1e5).round() as i64,
    )
}

/// Extract `display_name` from a Nominatim reverse response.
///
/// Nominatim reports un-geocodable coordinates as `{"error": ...}` with a
/// 200 status; that maps to `Ok(None)` rather than an error.
fn parse_display_name(body: &str) -> GeoResult<Option<String>> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| GeoError::InvalidResponse {
            message: format!("not JSON: {e}"),
        })?;

    if value.get("error").is_some() {
        return Ok(None);
    }

    Ok(value
        .get("display_name")
        .and_then(|v| v.as_str())
        .map(String::from))
}

// ============================================================================
// Tests
// ============================================================================
