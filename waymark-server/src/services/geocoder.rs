//! Place-name geocoding
//!
//! Coordinates are an enrichment, not a requirement: every failure mode
//! (timeout, non-2xx, empty result set, malformed body) resolves to
//! `None` so detection succeeds even when geocoding is down.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use waymark_common::models::Coordinates;
use waymark_common::{Error, Result};

use crate::config::GeocoderConfig;

const USER_AGENT: &str = "Waymark/0.1.0 (https://github.com/waymark/waymark)";

/// Seam for the reverse-geocoding lookup
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best-effort resolution of a place name to coordinates.
    async fn resolve(&self, query: &str) -> Option<Coordinates>;
}

/// Nominatim-style search result (coordinates arrive as strings)
#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

/// Production geocoder backed by a Nominatim-compatible endpoint
pub struct NominatimClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build geocoder client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn resolve(&self, query: &str) -> Option<Coordinates> {
        let url = format!("{}/search", self.base_url);

        let response = match self
            .http_client
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Geocode lookup failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(query = %query, status = %response.status(), "Geocode lookup returned error status");
            return None;
        }

        let results: Vec<SearchResult> = match response.json().await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Malformed geocode response");
                return None;
            }
        };

        let first = results.into_iter().next()?;
        match (first.lat.parse::<f64>(), first.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => {
                tracing::debug!(query = %query, lat, lon, "Geocode resolved");
                Some(Coordinates { lat, lon })
            }
            _ => {
                tracing::warn!(query = %query, "Geocode result had non-numeric coordinates");
                None
            }
        }
    }
}
