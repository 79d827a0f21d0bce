//! Saved-location API handlers
//!
//! POST /auth/locations — the migration target for anonymous collections

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use waymark_common::models::SavedLocation;

use crate::{api::auth::AuthUser, db, error::ApiResult, AppState};

/// POST /auth/locations response
#[derive(Debug, Serialize)]
pub struct SaveLocationResponse {
    pub status: &'static str,
    /// True when the id was already present and the call was a no-op
    pub duplicate: bool,
}

/// POST /auth/locations
///
/// Idempotent by location id, so the client migration can re-run safely
/// after a partial failure.
pub async fn add_saved_location(
    State(state): State<AppState>,
    user: AuthUser,
    Json(location): Json<SavedLocation>,
) -> ApiResult<Json<SaveLocationResponse>> {
    let inserted = db::locations::add_saved_location(&state.db, user.user_id, &location).await?;

    if inserted {
        tracing::info!(
            user_id = %user.user_id,
            location_id = %location.id(),
            name = %location.location.name,
            "Saved location stored"
        );
    } else {
        tracing::debug!(
            user_id = %user.user_id,
            location_id = %location.id(),
            "Saved location already present, ignoring"
        );
    }

    Ok(Json(SaveLocationResponse {
        status: "ok",
        duplicate: !inserted,
    }))
}

/// Build saved-location routes
pub fn location_routes() -> Router<AppState> {
    Router::new().route("/auth/locations", post(add_saved_location))
}
