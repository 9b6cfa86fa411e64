//! Offline-first sync engine
//!
//! One [`SyncCoordinator`] per entity family mediates every write so the UI
//! reads local state immediately and never blocks on the network; pull and
//! push cycles keep that state aligned with the user's remote collection.

mod coordinator;
mod events;
mod push;
pub(crate) mod resolve;
mod spawner;

pub use coordinator::SyncCoordinator;
pub use events::{SyncEvent, SyncEvents};
pub use push::{PushReport, PushWorker};
pub use resolve::{resolve, LocalMeta, Resolution};
pub use spawner::TaskSpawner;
