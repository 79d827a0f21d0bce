//! Bearer-token authentication for /auth routes
//!
//! Custom extractor pattern rather than middleware: handlers that need an
//! authenticated caller take an [`AuthUser`] parameter and receive the
//! resolved user directly. Token issuance lives in the account service;
//! this only validates.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{db, error::ApiError, AppState};

/// Authenticated user resolved from the Authorization header
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("Missing Authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthenticated("Authorization header must use the Bearer scheme".to_string())
        })?;

        let user = db::users::find_user_by_token(&state.db, token)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated("Unknown or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: user.user_id,
            username: user.username,
        })
    }
}
