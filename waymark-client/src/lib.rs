//! # Waymark Client Engine
//!
//! The on-device half of Waymark: a durable local cache of per-game
//! progress and saved locations, an HTTP adapter for the authoritative
//! server store, and the sync engine that reconciles the two.
//!
//! The cache works with no network at all; the sync engine writes through
//! to the server on a best-effort basis and migrates an anonymous local
//! collection into an account exactly once after authentication.

pub mod cache;
pub mod remote;
pub mod sync;

pub use cache::LocalCacheStore;
pub use remote::{HttpRemoteStore, RemoteError, RemoteProgressStore};
pub use sync::{MigrationReport, SyncEngine, SyncOutcome};
