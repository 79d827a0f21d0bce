//! Game progress API handlers
//!
//! POST /auth/progress, GET /auth/progress/:game_id

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use waymark_common::models::{normalize_completed, CompletedLocationInput, GameProgressEntry};

use crate::{
    api::auth::AuthUser,
    db,
    error::{ApiError, ApiResult},
    AppState,
};

/// POST /auth/progress request
///
/// `completedLocations` elements may be bare id strings or full objects;
/// they are normalized on ingestion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProgressRequest {
    pub game_id: String,
    pub completed: bool,
    #[serde(default)]
    pub completed_locations: Vec<CompletedLocationInput>,
}

/// POST /auth/progress
///
/// Replaces the stored collection for the game and returns the caller's
/// full progress list. Re-submitting the same set yields the same stored
/// state.
pub async fn upsert_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpsertProgressRequest>,
) -> ApiResult<Json<Vec<GameProgressEntry>>> {
    if request.game_id.trim().is_empty() {
        return Err(ApiError::BadRequest("gameId must not be empty".to_string()));
    }

    let normalized = normalize_completed(request.completed_locations);

    let all = db::progress::upsert_progress(
        &state.db,
        user.user_id,
        &request.game_id,
        &normalized,
        request.completed,
    )
    .await?;

    tracing::info!(
        user_id = %user.user_id,
        game_id = %request.game_id,
        locations = normalized.len(),
        completed = request.completed,
        "Progress upserted"
    );

    Ok(Json(all))
}

/// GET /auth/progress/:game_id
///
/// Returns a zeroed entry when no progress exists; "not found" is never
/// an error here.
pub async fn get_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(game_id): Path<String>,
) -> ApiResult<Json<GameProgressEntry>> {
    let entry = db::progress::fetch_progress(&state.db, user.user_id, &game_id).await?;
    Ok(Json(entry))
}

/// Build progress routes
pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/progress", post(upsert_progress))
        .route("/auth/progress/:game_id", get(get_progress))
}
