//! Vision classifier client
//!
//! Wraps the external vision-model call behind the [`Classifier`] seam.
//! One outbound request per call, bounded by a timeout; no internal
//! retries (retry policy belongs to the pipeline's caller).

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ClassifierConfig;

const USER_AGENT: &str = "Waymark/0.1.0 (https://github.com/waymark/waymark)";

/// Prompt selection for the classifier call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    /// Structured JSON identification, used by detection
    StructuredJson,
    /// Free-form description, used by image analysis
    FreeForm,
}

impl PromptVariant {
    fn prompt_text(self) -> &'static str {
        match self {
            PromptVariant::StructuredJson => {
                "Identify the landmark in this photo. Respond with a JSON object \
                 containing exactly these fields: \"name\" (the landmark's name), \
                 \"description\" (one or two sentences about it), and \"location\" \
                 (city and country). Respond with the JSON object only."
            }
            PromptVariant::FreeForm => {
                "Describe what you see in this photo, including any landmarks, \
                 architecture, or notable geographic features."
            }
        }
    }
}

/// Classifier call errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Transport, auth, or API-level failure
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    /// The bounded wait was exceeded
    #[error("Classifier timed out after {0:?}")]
    Timeout(Duration),
}

/// Seam for the opaque vision-model call
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        image: &[u8],
        mime_type: &str,
        variant: PromptVariant,
    ) -> Result<String, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct VisionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    mime_type: &'a str,
    image_data: String,
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    text: String,
}

/// Production classifier backed by the configured vision API
pub struct VisionClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl VisionClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl Classifier for VisionClient {
    async fn classify(
        &self,
        image: &[u8],
        mime_type: &str,
        variant: PromptVariant,
    ) -> Result<String, ClassifierError> {
        let payload = VisionRequest {
            model: &self.model,
            prompt: variant.prompt_text(),
            mime_type,
            image_data: base64::engine::general_purpose::STANDARD.encode(image),
        };

        let url = format!("{}/v1/generate", self.base_url);
        tracing::debug!(url = %url, bytes = image.len(), variant = ?variant, "Calling vision classifier");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout(self.timeout)
                } else {
                    ClassifierError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Unavailable(format!(
                "API error {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: VisionResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("Malformed API envelope: {}", e)))?;

        tracing::debug!(chars = body.text.len(), "Classifier response received");

        Ok(body.text)
    }
}
