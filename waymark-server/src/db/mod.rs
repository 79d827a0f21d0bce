//! Database access for waymark-server
//!
//! The server owns the authoritative per-account copy of progress and
//! saved locations; the on-device cache owns its own copy and the sync
//! engine is the only component that reconciles the two.

pub mod locations;
pub mod progress;
pub mod users;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist
///
/// Public so integration tests can run the same migrations against an
/// in-memory pool.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            token TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_progress (
            user_id TEXT NOT NULL,
            game_id TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            completed_locations TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (user_id, game_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS saved_locations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            location TEXT NOT NULL,
            lat REAL,
            lon REAL,
            image_reference TEXT NOT NULL,
            difficulty TEXT NOT NULL DEFAULT 'medium',
            notes TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (users, game_progress, saved_locations)");

    Ok(())
}
