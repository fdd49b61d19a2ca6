//! Reverse geocoding via the Nominatim HTTP API.

use crate::collaborators::Geolocator;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;

const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
const USER_AGENT: &str = concat!("raincheck/", env!("CARGO_PKG_VERSION"));

/// [`Geolocator`] backed by Nominatim's reverse endpoint.
///
/// Per the strategy contract every failure degrades to `None`; a broken
/// geocoder must never take historical lookups down with it.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Points the geocoder at a different Nominatim-compatible endpoint,
    /// e.g. a self-hosted instance or a test server.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        NominatimGeocoder {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geolocator for NominatimGeocoder {
    async fn country(&self, latitude: f64, longitude: f64) -> Option<String> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ])
            .header(reqwest::header::USER_AGENT, USER_AGENT);

        let response = match request.send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                warn!("Reverse geocoding failed for ({latitude}, {longitude}): {e}");
                return None;
            }
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Reverse geocoding returned malformed JSON: {e}");
                return None;
            }
        };

        let country = body
            .get("address")
            .and_then(|address| address.get("country"))
            .and_then(Value::as_str)
            .map(str::to_string);
        debug!("Reverse geocoded ({latitude}, {longitude}) to {country:?}");
        country
    }
}
