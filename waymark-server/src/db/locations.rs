//! Saved-location persistence
//!
//! Insertion is idempotent by location id so the client's anonymous-data
//! migration can safely re-run after a partial failure.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use waymark_common::models::{Coordinates, DetectedLocation, Difficulty, SavedLocation};
use waymark_common::{Error, Result};

/// Insert a saved location for a user. Returns `false` when the id was
/// already present (the row is left untouched).
pub async fn add_saved_location(
    db: &SqlitePool,
    user_id: Uuid,
    saved: &SavedLocation,
) -> Result<bool> {
    let (lat, lon) = match saved.location.coordinates {
        Some(c) => (Some(c.lat), Some(c.lon)),
        None => (None, None),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO saved_locations
            (id, user_id, name, description, location, lat, lon,
             image_reference, difficulty, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(saved.id().to_string())
    .bind(user_id.to_string())
    .bind(&saved.location.name)
    .bind(&saved.location.description)
    .bind(&saved.location.location)
    .bind(lat)
    .bind(lon)
    .bind(&saved.location.image_reference)
    .bind(saved.location.difficulty.as_str())
    .bind(&saved.notes)
    .bind(saved.created_at.to_rfc3339())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(result.rows_affected() > 0)
}

/// All saved locations for a user, insertion order
pub async fn list_saved_locations(db: &SqlitePool, user_id: Uuid) -> Result<Vec<SavedLocation>> {
    type Row = (
        String,
        String,
        String,
        String,
        Option<f64>,
        Option<f64>,
        String,
        String,
        Option<String>,
        String,
    );

    let rows: Vec<Row> = sqlx::query_as(
        "SELECT id, name, description, location, lat, lon,
                image_reference, difficulty, notes, created_at
         FROM saved_locations WHERE user_id = ? ORDER BY rowid",
    )
    .bind(user_id.to_string())
    .fetch_all(db)
    .await
    .map_err(Error::Database)?;

    rows.into_iter()
        .map(
            |(id, name, description, location, lat, lon, image_reference, difficulty, notes, created_at)| {
                let id = Uuid::parse_str(&id)
                    .map_err(|e| Error::Internal(format!("Corrupt saved_locations id: {}", e)))?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| Error::Internal(format!("Corrupt created_at: {}", e)))?
                    .with_timezone(&Utc);
                let coordinates = match (lat, lon) {
                    (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
                    _ => None,
                };
                Ok(SavedLocation {
                    location: DetectedLocation {
                        id,
                        name,
                        description,
                        location,
                        coordinates,
                        image_reference,
                        difficulty: Difficulty::from_str_lossy(&difficulty),
                    },
                    notes,
                    created_at,
                })
            },
        )
        .collect()
}
