//! larder-core - Core library for Larder
//!
//! Shared models, the local database layer, and the offline-first sync
//! engine used by all Larder interfaces. The engine keeps one local table
//! per entity family (pantry items, insight history) aligned with the
//! per-user collection in the cloud document store: writes commit locally
//! first and are pushed in the background, pulls reconcile the remote
//! snapshot without clobbering pending local edits.

pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod session;
pub mod sync;

pub use db::{Database, LocalStore, ReconcileSummary, SqliteStore};
pub use error::{AuthError, RemoteError, StoreError, SyncError};
pub use models::{
    InsightAction, InsightItem, ItemId, PantryItem, StorageLocation, Syncable, UserId,
};
pub use remote::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};
pub use session::Session;
pub use sync::{PushReport, PushWorker, SyncCoordinator, SyncEvent, SyncEvents};

/// Coordinator for the pantry family backed by the local `SQLite` store
pub type PantryCoordinator<R> = SyncCoordinator<PantryItem, SqliteStore<PantryItem>, R>;

/// Coordinator for the insight/history family
pub type InsightCoordinator<R> = SyncCoordinator<InsightItem, SqliteStore<InsightItem>, R>;
