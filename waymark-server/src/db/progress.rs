//! Game progress persistence
//!
//! One row per (user, game). Each upsert REPLACES the stored
//! completed-locations collection, which makes re-submitting the same set
//! idempotent; the merge semantics live in the sync engine, not here.

use sqlx::SqlitePool;
use uuid::Uuid;
use waymark_common::models::{CompletedLocation, GameProgressEntry};
use waymark_common::{Error, Result};

/// Replace the stored progress for (user, game) and return the user's
/// full progress list.
pub async fn upsert_progress(
    db: &SqlitePool,
    user_id: Uuid,
    game_id: &str,
    completed_locations: &[CompletedLocation],
    completed: bool,
) -> Result<Vec<GameProgressEntry>> {
    let locations_json = serde_json::to_string(completed_locations)
        .map_err(|e| Error::Internal(format!("Failed to encode completed locations: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO game_progress (user_id, game_id, completed, completed_locations)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id, game_id) DO UPDATE SET
            completed = excluded.completed,
            completed_locations = excluded.completed_locations
        "#,
    )
    .bind(user_id.to_string())
    .bind(game_id)
    .bind(completed)
    .bind(locations_json)
    .execute(db)
    .await
    .map_err(Error::Database)?;

    list_progress(db, user_id).await
}

/// Fetch progress for one game. A missing row materializes as a zeroed
/// entry, never as an error.
pub async fn fetch_progress(
    db: &SqlitePool,
    user_id: Uuid,
    game_id: &str,
) -> Result<GameProgressEntry> {
    let row: Option<(bool, String)> = sqlx::query_as(
        "SELECT completed, completed_locations FROM game_progress WHERE user_id = ? AND game_id = ?",
    )
    .bind(user_id.to_string())
    .bind(game_id)
    .fetch_optional(db)
    .await
    .map_err(Error::Database)?;

    match row {
        Some((completed, locations_json)) => Ok(GameProgressEntry {
            game_id: game_id.to_string(),
            completed,
            completed_locations: decode_locations(&locations_json)?,
        }),
        None => Ok(GameProgressEntry::zeroed(game_id)),
    }
}

/// All progress entries for a user, oldest game first
pub async fn list_progress(db: &SqlitePool, user_id: Uuid) -> Result<Vec<GameProgressEntry>> {
    let rows: Vec<(String, bool, String)> = sqlx::query_as(
        "SELECT game_id, completed, completed_locations FROM game_progress
         WHERE user_id = ? ORDER BY rowid",
    )
    .bind(user_id.to_string())
    .fetch_all(db)
    .await
    .map_err(Error::Database)?;

    rows.into_iter()
        .map(|(game_id, completed, locations_json)| {
            Ok(GameProgressEntry {
                game_id,
                completed,
                completed_locations: decode_locations(&locations_json)?,
            })
        })
        .collect()
}

fn decode_locations(json: &str) -> Result<Vec<CompletedLocation>> {
    serde_json::from_str(json)
        .map_err(|e| Error::Internal(format!("Corrupt completed_locations column: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn completed(ids: &[&str]) -> Vec<CompletedLocation> {
        ids.iter()
            .map(|id| CompletedLocation {
                location_id: id.to_string(),
                timestamp: Utc::now(),
            })
            .collect()
    }

    #[tokio::test]
    async fn fetch_missing_returns_zeroed_entry() {
        let pool = setup_test_db().await;
        let entry = fetch_progress(&pool, Uuid::new_v4(), "historic")
            .await
            .unwrap();
        assert_eq!(entry.game_id, "historic");
        assert!(!entry.completed);
        assert!(entry.completed_locations.is_empty());
    }

    #[tokio::test]
    async fn upsert_then_fetch_round_trips() {
        let pool = setup_test_db().await;
        let user_id = Uuid::new_v4();
        let locations = completed(&["a", "b"]);

        upsert_progress(&pool, user_id, "historic", &locations, false)
            .await
            .unwrap();

        let entry = fetch_progress(&pool, user_id, "historic").await.unwrap();
        assert_eq!(entry.completed_locations, locations);
        assert!(!entry.completed);
    }

    #[tokio::test]
    async fn upsert_replaces_the_collection() {
        let pool = setup_test_db().await;
        let user_id = Uuid::new_v4();

        upsert_progress(&pool, user_id, "historic", &completed(&["a", "b"]), false)
            .await
            .unwrap();
        let replacement = completed(&["a", "b", "c"]);
        upsert_progress(&pool, user_id, "historic", &replacement, true)
            .await
            .unwrap();

        let entry = fetch_progress(&pool, user_id, "historic").await.unwrap();
        assert_eq!(entry.completed_locations, replacement, "replace, not append");
        assert!(entry.completed);
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let pool = setup_test_db().await;
        let user_id = Uuid::new_v4();
        let locations = completed(&["a"]);

        let first = upsert_progress(&pool, user_id, "historic", &locations, false)
            .await
            .unwrap();
        let second = upsert_progress(&pool, user_id, "historic", &locations, false)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn list_returns_all_games_for_user_only() {
        let pool = setup_test_db().await;
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();

        upsert_progress(&pool, user_id, "historic", &completed(&["a"]), false)
            .await
            .unwrap();
        upsert_progress(&pool, user_id, "modern", &completed(&["x"]), false)
            .await
            .unwrap();
        upsert_progress(&pool, other_user, "historic", &completed(&["z"]), false)
            .await
            .unwrap();

        let entries = list_progress(&pool, user_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].game_id, "historic");
        assert_eq!(entries[1].game_id, "modern");
    }
}
