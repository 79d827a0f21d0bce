//! Progress synchronization engine
//!
//! The only component allowed to reconcile the on-device cache with the
//! remote store. Mutations are write-through: the local cache is updated
//! synchronously and is always the source of truth; the remote write is
//! best-effort and its failure is a warning, never an error, so gameplay
//! continues uninterrupted offline.
//!
//! Completion state is monotonic: a location once recorded for a
//! (user, game) pair is never removed by any sync operation; all merges
//! are additive.
//!
//! Callers must serialize mutations per game id: the engine does
//! read-modify-write against the cache without its own locking.

use chrono::Utc;
use uuid::Uuid;
use waymark_common::events::{EventBus, WaymarkEvent};
use waymark_common::models::{
    CompletedLocation, DetectedLocation, GameCatalog, GameProgressEntry, SavedLocation,
    UserSession,
};
use waymark_common::{Error, Result};

use crate::cache::LocalCacheStore;
use crate::remote::{RemoteError, RemoteProgressStore};

const EVENT_CAPACITY: usize = 100;

/// Result of one progress mutation
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// The entry as stored locally after the mutation
    pub entry: GameProgressEntry,
    /// False when the write-through did not reach the remote store; the
    /// local copy remains authoritative and a later mutation converges.
    pub remote_synced: bool,
}

/// Per-item outcome of an anonymous-collection migration
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub migrated: Vec<Uuid>,
    pub failed: Vec<(Uuid, RemoteError)>,
    /// True when the local savedLocations namespace was cleared (every
    /// item uploaded, or nothing to migrate)
    pub cleared_local: bool,
}

impl MigrationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Reconciles the local cache with the remote progress store
pub struct SyncEngine<R: RemoteProgressStore> {
    cache: LocalCacheStore,
    remote: Option<R>,
    catalog: GameCatalog,
    events: EventBus,
}

impl<R: RemoteProgressStore> SyncEngine<R> {
    /// Anonymous engine: all state stays in the local cache until a
    /// session is attached.
    pub fn new(cache: LocalCacheStore, catalog: GameCatalog) -> Self {
        Self {
            cache,
            remote: None,
            catalog,
            events: EventBus::new(EVENT_CAPACITY),
        }
    }

    /// Mutation notifications; fired exactly on successful mutation.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_authenticated(&self) -> bool {
        self.remote.is_some()
    }

    /// Install an authenticated session: persist it, seed the cache with
    /// the account's existing progress (additive merge, local first) and
    /// attach the remote store. Callers should run
    /// [`Self::migrate_anonymous_collection`] immediately afterwards.
    pub async fn attach_session(&mut self, session: &UserSession, remote: R) -> Result<()> {
        self.cache.set_session(session).await?;

        for theirs in &session.game_progress {
            let merged = match self.cache.game_progress_entry(&theirs.game_id).await? {
                Some(mut local) => {
                    local.merge(theirs);
                    local
                }
                None => theirs.clone(),
            };
            self.cache.set_game_progress_entry(&merged).await?;
        }

        self.remote = Some(remote);
        tracing::info!(user_id = %session.user_id, "Session attached");
        Ok(())
    }

    /// Record one completed location for a game.
    ///
    /// Deduplicates by location id; an already-recorded location leaves
    /// local state untouched. The write-through still runs for repeats so
    /// an earlier deferred sync converges on the next mutation attempt.
    pub async fn record_completion(&self, game_id: &str, location_id: &str) -> Result<SyncOutcome> {
        let mut entry = self
            .cache
            .game_progress_entry(game_id)
            .await?
            .unwrap_or_else(|| GameProgressEntry::zeroed(game_id));

        if !entry.contains(location_id) {
            let timestamp = Utc::now();
            entry.completed_locations.push(CompletedLocation {
                location_id: location_id.to_string(),
                timestamp,
            });
            // completion is monotonic; coverage can only add to it
            entry.completed = entry.completed || self.catalog.is_covered(&entry);

            self.cache.set_game_progress_entry(&entry).await?;
            self.events.emit_lossy(WaymarkEvent::ProgressRecorded {
                game_id: entry.game_id.clone(),
                location_id: location_id.to_string(),
                completed: entry.completed,
                timestamp,
            });
        }

        let remote_synced = self.push_remote(&entry).await;

        Ok(SyncOutcome {
            entry,
            remote_synced,
        })
    }

    /// Load progress for a game: local-first, then remote when
    /// authenticated, else a zeroed entry.
    pub async fn load_progress(&self, game_id: &str) -> Result<GameProgressEntry> {
        if let Some(entry) = self.cache.game_progress_entry(game_id).await? {
            return Ok(entry);
        }

        if let Some(remote) = &self.remote {
            match remote.fetch_progress(game_id).await {
                Ok(entry) => {
                    self.cache.set_game_progress_entry(&entry).await?;
                    return Ok(entry);
                }
                Err(err) => {
                    // not cached, so the next online read retries
                    tracing::warn!(
                        game_id = %game_id,
                        error = %err,
                        "Remote progress fetch failed; returning zeroed entry"
                    );
                }
            }
        }

        Ok(GameProgressEntry::zeroed(game_id))
    }

    /// Keep a detected location. Stored locally always; uploaded
    /// best-effort when authenticated.
    pub async fn save_location(
        &self,
        location: DetectedLocation,
        notes: Option<String>,
    ) -> Result<SavedLocation> {
        let saved = SavedLocation {
            location,
            notes,
            created_at: Utc::now(),
        };

        let inserted = self.cache.push_saved_location(&saved).await?;
        if inserted {
            self.events.emit_lossy(WaymarkEvent::LocationSaved {
                location_id: saved.id(),
                timestamp: saved.created_at,
            });

            if let Some(remote) = &self.remote {
                if let Err(err) = remote.add_saved_location(&saved).await {
                    tracing::warn!(
                        location_id = %saved.id(),
                        error = %err,
                        "Saved-location upload failed; local copy retained"
                    );
                }
            }
        }

        Ok(saved)
    }

    /// Upload every anonymously saved location into the account.
    ///
    /// Idempotent and safe to re-run: the upload is deduplicated remotely
    /// by location id, and the local namespace is cleared only when every
    /// item made it. Partial failure leaves all local copies intact so
    /// nothing is lost.
    pub async fn migrate_anonymous_collection(&self) -> Result<MigrationReport> {
        let Some(remote) = &self.remote else {
            return Err(Error::InvalidInput(
                "Migration requires an authenticated session".to_string(),
            ));
        };

        let locations = self.cache.saved_locations().await?;
        if locations.is_empty() {
            return Ok(MigrationReport {
                cleared_local: true,
                ..Default::default()
            });
        }

        let mut migrated = Vec::new();
        let mut failed = Vec::new();

        for saved in &locations {
            match remote.add_saved_location(saved).await {
                Ok(()) => migrated.push(saved.id()),
                Err(err) => {
                    tracing::warn!(
                        location_id = %saved.id(),
                        error = %err,
                        "Saved-location migration failed; local copy retained"
                    );
                    failed.push((saved.id(), err));
                }
            }
        }

        let cleared_local = failed.is_empty();
        if cleared_local {
            self.cache.clear_saved_locations().await?;
            tracing::info!(
                count = migrated.len(),
                "Anonymous collection migrated; local copies cleared"
            );
        }

        self.events.emit_lossy(WaymarkEvent::MigrationFinished {
            migrated: migrated.len(),
            failed: failed.len(),
            timestamp: Utc::now(),
        });

        Ok(MigrationReport {
            migrated,
            failed,
            cleared_local,
        })
    }

    /// End the session. Clears the session keys only; progress and saved
    /// locations accumulated so far stay cached, since they may still be
    /// needed by a later migration or a future anonymous session.
    pub async fn logout(&mut self) -> Result<()> {
        self.cache.clear_session().await?;
        self.remote = None;
        self.events.emit_lossy(WaymarkEvent::SessionCleared {
            timestamp: Utc::now(),
        });
        tracing::info!("Session cleared; progress and saved locations retained");
        Ok(())
    }

    async fn push_remote(&self, entry: &GameProgressEntry) -> bool {
        let Some(remote) = &self.remote else {
            return false;
        };

        match remote
            .upsert_progress(&entry.game_id, &entry.completed_locations, entry.completed)
            .await
        {
            Ok(_) => {
                self.events.emit_lossy(WaymarkEvent::ProgressSynced {
                    game_id: entry.game_id.clone(),
                    timestamp: Utc::now(),
                });
                true
            }
            Err(err) => {
                tracing::warn!(
                    game_id = %entry.game_id,
                    error = %err,
                    "Remote progress write failed; local copy remains authoritative"
                );
                self.events.emit_lossy(WaymarkEvent::SyncDeferred {
                    game_id: entry.game_id.clone(),
                    reason: err.to_string(),
                    timestamp: Utc::now(),
                });
                false
            }
        }
    }
}
