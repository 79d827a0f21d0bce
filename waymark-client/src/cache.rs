//! On-device cache
//!
//! A SQLite-backed key-value store holding the four persisted namespaces:
//! `user`, `token`, `gameProgress`, `savedLocations`. Values are
//! JSON-encoded; absence of a key is always "empty", never an error.
//! Every mutation is immediately durable.
//!
//! Concurrency discipline: one logical owner per namespace. The sync
//! engine owns `gameProgress` and `savedLocations`; callers must not
//! read-modify-write those namespaces around it.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use waymark_common::models::{GameProgressEntry, SavedLocation, UserSession};
use waymark_common::{Error, Result};

const KEY_USER: &str = "user";
const KEY_TOKEN: &str = "token";
const KEY_GAME_PROGRESS: &str = "gameProgress";
const KEY_SAVED_LOCATIONS: &str = "savedLocations";

/// Durable key-value store for on-device state
#[derive(Clone)]
pub struct LocalCacheStore {
    db: SqlitePool,
}

impl LocalCacheStore {
    /// Open (or create) the cache database at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Opening cache database: {}", db_url);

        let db = SqlitePool::connect(&db_url).await.map_err(Error::Database)?;
        init_cache_table(&db).await?;

        Ok(Self { db })
    }

    /// In-memory cache for tests and ephemeral sessions.
    pub async fn open_in_memory() -> Result<Self> {
        let db = SqlitePool::connect(":memory:")
            .await
            .map_err(Error::Database)?;
        init_cache_table(&db).await?;
        Ok(Self { db })
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await
            .map_err(Error::Database)?;

        match row {
            Some((value,)) => {
                let decoded = serde_json::from_str(&value).map_err(|e| {
                    Error::Internal(format!("Corrupt cache value for key '{}': {}", key, e))
                })?;
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| Error::Internal(format!("Failed to encode cache value: {}", e)))?;

        sqlx::query(
            "INSERT INTO cache (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(encoded)
        .execute(&self.db)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    // ---- gameProgress namespace ----

    /// The full progress map. An absent key materializes as empty.
    pub async fn game_progress(&self) -> Result<HashMap<String, GameProgressEntry>> {
        Ok(self
            .get_json(KEY_GAME_PROGRESS)
            .await?
            .unwrap_or_default())
    }

    /// One game's cached entry, if present.
    pub async fn game_progress_entry(&self, game_id: &str) -> Result<Option<GameProgressEntry>> {
        Ok(self.game_progress().await?.remove(game_id))
    }

    /// Store one game's entry (read-modify-write of the map).
    pub async fn set_game_progress_entry(&self, entry: &GameProgressEntry) -> Result<()> {
        let mut map = self.game_progress().await?;
        map.insert(entry.game_id.clone(), entry.clone());
        self.set_json(KEY_GAME_PROGRESS, &map).await
    }

    // ---- savedLocations namespace ----

    /// All saved locations, insertion order.
    pub async fn saved_locations(&self) -> Result<Vec<SavedLocation>> {
        Ok(self
            .get_json(KEY_SAVED_LOCATIONS)
            .await?
            .unwrap_or_default())
    }

    /// Append a saved location, deduplicating by id. Returns `false`
    /// when the id was already present.
    pub async fn push_saved_location(&self, saved: &SavedLocation) -> Result<bool> {
        let mut locations = self.saved_locations().await?;
        if locations.iter().any(|l| l.id() == saved.id()) {
            return Ok(false);
        }
        locations.push(saved.clone());
        self.set_json(KEY_SAVED_LOCATIONS, &locations).await?;
        Ok(true)
    }

    /// Drop the whole savedLocations namespace (after a fully successful
    /// migration).
    pub async fn clear_saved_locations(&self) -> Result<()> {
        self.remove(KEY_SAVED_LOCATIONS).await
    }

    // ---- session namespace ----

    pub async fn session(&self) -> Result<Option<UserSession>> {
        self.get_json(KEY_USER).await
    }

    /// Persist the session under both session keys.
    pub async fn set_session(&self, session: &UserSession) -> Result<()> {
        self.set_json(KEY_USER, session).await?;
        self.set_json(KEY_TOKEN, &session.token).await
    }

    pub async fn token(&self) -> Result<Option<String>> {
        self.get_json(KEY_TOKEN).await
    }

    /// Clear session-scoped keys only. Progress and saved locations
    /// survive logout: they may still be needed by a later migration or
    /// a future anonymous session.
    pub async fn clear_session(&self) -> Result<()> {
        self.remove(KEY_USER).await?;
        self.remove(KEY_TOKEN).await
    }
}

async fn init_cache_table(db: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
