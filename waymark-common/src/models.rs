//! Shared data model for Waymark
//!
//! Canonical shapes for landmark detection results and per-game progress.
//! Wire names are camelCase to match the HTTP API; legacy inbound shapes
//! are normalized here so every other component sees exactly one form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Name substituted when the classifier response cannot be decoded
pub const UNKNOWN_LANDMARK: &str = "Unknown Landmark";

/// Location substituted when the classifier response cannot be decoded
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Name substituted when the classifier returned nothing usable at all
pub const DETECTION_FAILED: &str = "Landmark Detection Failed";

/// WGS-84 coordinates from the geocode lookup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Difficulty rating attached to a detected location
///
/// Detection always assigns `Medium`; no classifier signal currently
/// informs difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parse a stored difficulty string; unrecognized values fall back to
    /// the default rather than failing a read.
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

/// Parser output: a landmark identification not yet geocoded
///
/// Invariant: all three fields are non-empty after fallback substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkCandidate {
    pub name: String,
    pub description: String,
    pub location: String,
}

/// A completed detection; immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLocation {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    /// Input image embedded as a `data:` URI
    pub image_reference: String,
    pub difficulty: Difficulty,
}

impl DetectedLocation {
    /// Soft-failure check: the pipeline completed normally but carries a
    /// sentinel payload rather than a real identification. Callers should
    /// offer a retry with the same image instead of persisting the result.
    pub fn is_soft_failure(&self) -> bool {
        self.name == UNKNOWN_LANDMARK || self.name == DETECTION_FAILED
    }
}

/// A detected location the user chose to keep
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLocation {
    #[serde(flatten)]
    pub location: DetectedLocation,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SavedLocation {
    pub fn id(&self) -> Uuid {
        self.location.id
    }
}

/// One completed location inside a game progress record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLocation {
    pub location_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Inbound completed-location element
///
/// Legacy callers send a bare identifier string; current callers send the
/// full object. Both normalize into [`CompletedLocation`] immediately on
/// ingestion so nothing downstream ever sees the duck-typed shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CompletedLocationInput {
    Full {
        #[serde(rename = "locationId")]
        location_id: String,
        timestamp: DateTime<Utc>,
    },
    Bare(String),
}

impl CompletedLocationInput {
    /// Canonicalize one element. A bare identifier carries no completion
    /// time, so it is stamped with the ingestion time.
    pub fn normalize(self) -> CompletedLocation {
        match self {
            CompletedLocationInput::Full {
                location_id,
                timestamp,
            } => CompletedLocation {
                location_id,
                timestamp,
            },
            CompletedLocationInput::Bare(location_id) => CompletedLocation {
                location_id,
                timestamp: Utc::now(),
            },
        }
    }
}

/// Normalize an inbound collection, deduplicating by location id.
/// First occurrence wins; insertion order is preserved.
pub fn normalize_completed(inputs: Vec<CompletedLocationInput>) -> Vec<CompletedLocation> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(inputs.len());
    for input in inputs {
        let entry = input.normalize();
        if seen.insert(entry.location_id.clone()) {
            out.push(entry);
        }
    }
    out
}

/// Per-(user, game) completion record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProgressEntry {
    pub game_id: String,
    pub completed: bool,
    pub completed_locations: Vec<CompletedLocation>,
}

impl GameProgressEntry {
    /// The "no progress yet" shape. Absence of a stored entry always
    /// materializes as this, never as an error.
    pub fn zeroed(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            completed: false,
            completed_locations: Vec::new(),
        }
    }

    /// Whether `location_id` is already recorded
    pub fn contains(&self, location_id: &str) -> bool {
        self.completed_locations
            .iter()
            .any(|c| c.location_id == location_id)
    }

    /// Additive union with `other`, deduplicated by location id.
    ///
    /// `self`'s entries keep their position; unseen entries from `other`
    /// append in their own order. `completed` is monotonic: once true on
    /// either side it stays true.
    pub fn merge(&mut self, other: &GameProgressEntry) {
        for theirs in &other.completed_locations {
            if !self.contains(&theirs.location_id) {
                self.completed_locations.push(theirs.clone());
            }
        }
        self.completed = self.completed || other.completed;
    }
}

/// Locations defined per game, supplied by the embedding application so
/// the sync engine can recompute completion after each mutation
#[derive(Debug, Clone, Default)]
pub struct GameCatalog {
    games: HashMap<String, Vec<String>>,
}

impl GameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, game_id: impl Into<String>, location_ids: Vec<String>) {
        self.games.insert(game_id.into(), location_ids);
    }

    pub fn locations(&self, game_id: &str) -> Option<&[String]> {
        self.games.get(game_id).map(|v| v.as_slice())
    }

    /// Whether `entry` covers every location defined for its game.
    ///
    /// A game with no defined locations (or absent from the catalog) is
    /// never considered covered: auto-completing on emptiness would mark
    /// unknown games complete on first touch, and completion is
    /// irreversible under the monotonic merge rule.
    pub fn is_covered(&self, entry: &GameProgressEntry) -> bool {
        match self.locations(&entry.game_id) {
            Some(ids) if !ids.is_empty() => ids.iter().all(|id| entry.contains(id)),
            _ => false,
        }
    }
}

/// Authenticated session as held by the on-device cache
///
/// Created at login/registration, cleared from the cache at logout; the
/// server-side store is untouched by logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
    pub game_progress: Vec<GameProgressEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(game_id: &str, ids: &[&str]) -> GameProgressEntry {
        GameProgressEntry {
            game_id: game_id.to_string(),
            completed: false,
            completed_locations: ids
                .iter()
                .map(|id| CompletedLocation {
                    location_id: id.to_string(),
                    timestamp: Utc::now(),
                })
                .collect(),
        }
    }

    #[test]
    fn bare_input_normalizes_with_ingestion_timestamp() {
        let before = Utc::now();
        let normalized = CompletedLocationInput::Bare("loc-1".to_string()).normalize();
        assert_eq!(normalized.location_id, "loc-1");
        assert!(normalized.timestamp >= before);
    }

    #[test]
    fn full_input_keeps_original_timestamp() {
        let ts = "2025-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let normalized = CompletedLocationInput::Full {
            location_id: "loc-2".to_string(),
            timestamp: ts,
        }
        .normalize();
        assert_eq!(normalized.timestamp, ts);
    }

    #[test]
    fn mixed_input_shapes_deserialize() {
        let json = r#"["loc-1", {"locationId": "loc-2", "timestamp": "2025-03-01T12:00:00Z"}]"#;
        let inputs: Vec<CompletedLocationInput> = serde_json::from_str(json).unwrap();
        let normalized = normalize_completed(inputs);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].location_id, "loc-1");
        assert_eq!(normalized[1].location_id, "loc-2");
    }

    #[test]
    fn normalize_deduplicates_first_occurrence_wins() {
        let ts = "2025-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let inputs = vec![
            CompletedLocationInput::Full {
                location_id: "loc-1".to_string(),
                timestamp: ts,
            },
            CompletedLocationInput::Bare("loc-1".to_string()),
            CompletedLocationInput::Bare("loc-2".to_string()),
        ];
        let normalized = normalize_completed(inputs);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].location_id, "loc-1");
        assert_eq!(normalized[0].timestamp, ts, "first occurrence wins");
    }

    #[test]
    fn merge_is_additive_and_preserves_order() {
        let mut local = entry_with("historic", &["a", "b"]);
        let remote = entry_with("historic", &["b", "c"]);
        local.merge(&remote);

        let ids: Vec<&str> = local
            .completed_locations
            .iter()
            .map(|c| c.location_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_completed_is_monotonic() {
        let mut local = entry_with("historic", &["a"]);
        let mut remote = entry_with("historic", &[]);
        remote.completed = true;

        local.merge(&remote);
        assert!(local.completed);

        // merging an incomplete entry never clears the flag
        let incomplete = entry_with("historic", &[]);
        local.merge(&incomplete);
        assert!(local.completed);
    }

    #[test]
    fn catalog_covered_requires_every_location() {
        let mut catalog = GameCatalog::new();
        catalog.insert("historic", vec!["a".into(), "b".into(), "c".into()]);

        assert!(!catalog.is_covered(&entry_with("historic", &["a", "b"])));
        assert!(catalog.is_covered(&entry_with("historic", &["a", "b", "c"])));
    }

    #[test]
    fn empty_or_unknown_game_is_never_covered() {
        let mut catalog = GameCatalog::new();
        catalog.insert("empty", Vec::new());

        assert!(!catalog.is_covered(&entry_with("empty", &[])));
        assert!(!catalog.is_covered(&entry_with("unknown-game", &["a"])));
    }

    #[test]
    fn sentinel_names_are_soft_failures() {
        let mut location = DetectedLocation {
            id: Uuid::new_v4(),
            name: UNKNOWN_LANDMARK.to_string(),
            description: "d".to_string(),
            location: UNKNOWN_LOCATION.to_string(),
            coordinates: None,
            image_reference: "data:image/jpeg;base64,".to_string(),
            difficulty: Difficulty::default(),
        };
        assert!(location.is_soft_failure());

        location.name = DETECTION_FAILED.to_string();
        assert!(location.is_soft_failure());

        location.name = "Eiffel Tower".to_string();
        assert!(!location.is_soft_failure());
    }

    #[test]
    fn saved_location_round_trips_with_flattened_fields() {
        let saved = SavedLocation {
            location: DetectedLocation {
                id: Uuid::new_v4(),
                name: "Eiffel Tower".to_string(),
                description: "Iron lattice tower".to_string(),
                location: "Paris, France".to_string(),
                coordinates: Some(Coordinates {
                    lat: 48.8584,
                    lon: 2.2945,
                }),
                image_reference: "data:image/jpeg;base64,abcd".to_string(),
                difficulty: Difficulty::Medium,
            },
            notes: Some("visited in spring".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&saved).unwrap();
        assert!(json.get("imageReference").is_some(), "camelCase wire names");
        assert!(json.get("createdAt").is_some());

        let back: SavedLocation = serde_json::from_value(json).unwrap();
        assert_eq!(back.id(), saved.id());
        assert_eq!(back.notes, saved.notes);
    }

    #[test]
    fn zeroed_entry_is_empty_and_incomplete() {
        let entry = GameProgressEntry::zeroed("historic");
        assert_eq!(entry.game_id, "historic");
        assert!(!entry.completed);
        assert!(entry.completed_locations.is_empty());
    }
}
