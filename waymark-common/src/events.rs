//! Event types and EventBus for Waymark
//!
//! The sync engine notifies interested observers exactly when a mutation
//! succeeds; nothing polls. Events are serializable so an embedding UI can
//! forward them over whatever transport it uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Waymark event types
///
/// Broadcast via [`EventBus`]; every variant corresponds to one successful
/// mutation of local or remote state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WaymarkEvent {
    /// A location was recorded as completed in the local cache
    ProgressRecorded {
        game_id: String,
        location_id: String,
        /// Whether the game is now fully completed
        completed: bool,
        timestamp: DateTime<Utc>,
    },

    /// The remote store accepted the write-through for a game
    ProgressSynced {
        game_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The remote write-through failed; the local copy remains the source
    /// of truth and gameplay continues uninterrupted
    SyncDeferred {
        game_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A detected location was added to the saved collection
    LocationSaved {
        location_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Anonymous-collection migration finished (fully or partially)
    MigrationFinished {
        migrated: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Session-scoped keys were cleared at logout
    SessionCleared { timestamp: DateTime<Utc> },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
///
/// # Examples
///
/// ```
/// use waymark_common::events::{EventBus, WaymarkEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(WaymarkEvent::SessionCleared {
///     timestamp: chrono::Utc::now(),
/// });
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WaymarkEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity.
    ///
    /// Old events are dropped once `capacity` unread events accumulate in
    /// a subscriber's queue; 100 is plenty for interactive use, tests can
    /// go smaller.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WaymarkEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` otherwise.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WaymarkEvent,
    ) -> Result<usize, broadcast::error::SendError<WaymarkEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    ///
    /// Mutation notifications are advisory: a missing subscriber must not
    /// turn a successful mutation into an error.
    pub fn emit_lossy(&self, event: WaymarkEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
