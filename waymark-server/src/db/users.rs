//! User lookup backing the bearer-token check
//!
//! Session issuance (registration, login, token minting) happens in the
//! account service; this module only resolves an already-issued token to
//! its user.

use sqlx::SqlitePool;
use uuid::Uuid;
use waymark_common::{Error, Result};

/// A user resolved from a bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Resolve a bearer token to its user. `None` means unknown token.
pub async fn find_user_by_token(db: &SqlitePool, token: &str) -> Result<Option<AuthUser>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT user_id, username FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(db)
            .await
            .map_err(Error::Database)?;

    match row {
        Some((user_id, username)) => {
            let user_id = Uuid::parse_str(&user_id)
                .map_err(|e| Error::Internal(format!("Corrupt user_id in users table: {}", e)))?;
            Ok(Some(AuthUser { user_id, username }))
        }
        None => Ok(None),
    }
}

/// Insert a user row. Used when the account service provisions a session
/// into this store, and by tests.
pub async fn insert_user(
    db: &SqlitePool,
    user_id: Uuid,
    username: &str,
    token: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO users (user_id, username, token) VALUES (?, ?, ?)")
        .bind(user_id.to_string())
        .bind(username)
        .bind(token)
        .execute(db)
        .await
        .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let pool = setup_test_db().await;
        let user = find_user_by_token(&pool, "no-such-token").await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn token_resolves_to_user() {
        let pool = setup_test_db().await;
        let user_id = Uuid::new_v4();
        insert_user(&pool, user_id, "ada", "token-123").await.unwrap();

        let user = find_user_by_token(&pool, "token-123")
            .await
            .unwrap()
            .expect("user should resolve");
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.username, "ada");
    }
}
