//! Remote progress store adapter
//!
//! HTTP client for the authoritative server store, consumed by the sync
//! engine through the [`RemoteProgressStore`] seam so tests can inject an
//! in-memory double.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use waymark_common::models::{CompletedLocation, GameProgressEntry, SavedLocation};

const USER_AGENT: &str = "Waymark/0.1.0 (https://github.com/waymark/waymark)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote store errors
///
/// `Unauthenticated` is its own variant because the sync engine must not
/// treat an auth failure as data loss.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed server response: {0}")]
    Parse(String),
}

/// Interface the sync engine consumes
#[async_trait]
pub trait RemoteProgressStore: Send + Sync {
    /// Replace the stored collection for `game_id`; idempotent. Returns
    /// the account's full progress list.
    async fn upsert_progress(
        &self,
        game_id: &str,
        completed_locations: &[CompletedLocation],
        completed: bool,
    ) -> Result<Vec<GameProgressEntry>, RemoteError>;

    /// Zeroed-or-existing entry; "not found" never errors.
    async fn fetch_progress(&self, game_id: &str) -> Result<GameProgressEntry, RemoteError>;

    /// Idempotent by `location.id`.
    async fn add_saved_location(&self, location: &SavedLocation) -> Result<(), RemoteError>;
}

/// Production adapter talking to waymark-server with a bearer token
pub struct HttpRemoteStore {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, token: &str) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.as_u16() == 401 {
            return Err(RemoteError::Unauthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api(status.as_u16(), body));
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteProgressStore for HttpRemoteStore {
    async fn upsert_progress(
        &self,
        game_id: &str,
        completed_locations: &[CompletedLocation],
        completed: bool,
    ) -> Result<Vec<GameProgressEntry>, RemoteError> {
        let payload = json!({
            "gameId": game_id,
            "completed": completed,
            "completedLocations": completed_locations,
        });

        let response = self
            .http_client
            .post(format!("{}/auth/progress", self.base_url))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }

    async fn fetch_progress(&self, game_id: &str) -> Result<GameProgressEntry, RemoteError> {
        let response = self
            .http_client
            .get(format!("{}/auth/progress/{}", self.base_url, game_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }

    async fn add_saved_location(&self, location: &SavedLocation) -> Result<(), RemoteError> {
        let response = self
            .http_client
            .post(format!("{}/auth/locations", self.base_url))
            .bearer_auth(&self.token)
            .json(location)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_strips_trailing_slash() {
        let store = HttpRemoteStore::new("http://localhost:5860/", "tok").unwrap();
        assert_eq!(store.base_url, "http://localhost:5860");
    }
}
