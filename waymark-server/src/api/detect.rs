//! Detection API handlers
//!
//! POST /detect-location, POST /analyze-image

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use waymark_common::models::DetectedLocation;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Photos from modern phones routinely exceed axum's 2 MB default
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// POST /analyze-image response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// Uploaded image extracted from the multipart body
struct UploadedImage {
    bytes: Vec<u8>,
    mime_type: String,
}

/// Pull the `image` field out of the multipart body.
///
/// Validation happens before any external call: a missing or empty image
/// part is rejected as a client error.
async fn extract_image(mut multipart: Multipart) -> ApiResult<UploadedImage> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read image field: {}", e)))?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Image field is empty".to_string()));
        }

        return Ok(UploadedImage {
            bytes: bytes.to_vec(),
            mime_type,
        });
    }

    Err(ApiError::BadRequest(
        "Missing image field in multipart body".to_string(),
    ))
}

/// POST /detect-location
///
/// Always 200 on a completed pipeline run, including soft-failure
/// sentinel content; 400 for a missing image; 502 only for a hard
/// classifier/transport failure.
pub async fn detect_location(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<DetectedLocation>> {
    let image = extract_image(multipart).await?;

    let detected = state
        .pipeline
        .detect(&image.bytes, &image.mime_type)
        .await?;

    Ok(Json(detected))
}

/// POST /analyze-image
pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let image = extract_image(multipart).await?;

    let analysis = state
        .pipeline
        .analyze(&image.bytes, &image.mime_type)
        .await?;

    Ok(Json(AnalyzeResponse { analysis }))
}

/// Build detection routes
pub fn detection_routes() -> Router<AppState> {
    Router::new()
        .route("/detect-location", post(detect_location))
        .route("/analyze-image", post(analyze_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
