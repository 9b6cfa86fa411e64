//! Sync coordinator: the single mutation point for one entity family
//!
//! Every write commits locally first and returns; the matching remote write
//! runs detached and only flips the sync flag on confirmation. A full
//! `sync_remote` is pull-then-push: the pull result goes back to the caller,
//! the push is fire-and-forget.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;

use crate::db::{LocalStore, ReconcileSummary, SqliteStore};
use crate::error::{StoreResult, SyncResult};
use crate::models::{now_millis, ItemId, PantryItem, StorageLocation, Syncable};
use crate::remote::RemoteStore;
use crate::session::Session;

use super::events::{self, EventSink, SyncEvent, SyncEvents};
use super::push::PushWorker;
use super::spawner::TaskSpawner;

const DAY_MS: i64 = 86_400_000;

#[derive(Clone, Copy)]
enum WriteKind {
    Create,
    Update,
}

impl WriteKind {
    const fn task_name(self) -> &'static str {
        match self {
            Self::Create => "remote create",
            Self::Update => "remote update",
        }
    }
}

/// Orchestrates one entity family between the local and remote stores
pub struct SyncCoordinator<T, L, R> {
    local: Arc<L>,
    remote: Arc<R>,
    spawner: TaskSpawner,
    events: EventSink,
    _marker: PhantomData<fn() -> T>,
}

impl<T, L, R> SyncCoordinator<T, L, R>
where
    T: Syncable,
    L: LocalStore<T>,
    R: RemoteStore<T> + 'static,
{
    /// Build a coordinator on the current runtime
    ///
    /// Returns the coordinator and the single-consumer event queue.
    pub fn new(local: Arc<L>, remote: Arc<R>) -> (Self, SyncEvents) {
        Self::with_spawner(local, remote, TaskSpawner::current())
    }

    /// Build with an explicit spawner (shared across families)
    pub fn with_spawner(local: Arc<L>, remote: Arc<R>, spawner: TaskSpawner) -> (Self, SyncEvents) {
        let (events, queue) = events::channel();
        (
            Self {
                local,
                remote,
                spawner,
                events,
                _marker: PhantomData,
            },
            queue,
        )
    }

    /// Create an item: local write first (optimistic), remote create detached
    pub fn create(&self, session: &Session, item: T) -> SyncResult<()> {
        self.write(session, item, WriteKind::Create)
    }

    /// Update an item: local write first, remote update detached
    pub fn update(&self, session: &Session, item: T) -> SyncResult<()> {
        self.write(session, item, WriteKind::Update)
    }

    fn write(&self, session: &Session, mut item: T, kind: WriteKind) -> SyncResult<()> {
        let user = session.user_id()?.clone();
        item.touch();
        self.local.upsert(&item, false)?;

        let id = *item.id();
        let stamp = item.updated_at();
        let local = Arc::clone(&self.local);
        let remote = Arc::clone(&self.remote);
        let events = self.events.clone();
        self.spawner.spawn(kind.task_name(), async move {
            let result = match kind {
                WriteKind::Create => remote.create(&user, &item).await.map(|_| ()),
                WriteKind::Update => remote.update(&user, &item).await.map(|_| ()),
            };
            match result {
                Ok(()) => {
                    // False means a newer local edit superseded this write;
                    // it stays dirty and the next push cycle carries it.
                    if local.mark_synced(&id, stamp)? {
                        events.emit(SyncEvent::RemoteWriteConfirmed(id));
                    }
                    Ok(())
                }
                Err(error) => {
                    events.emit(SyncEvent::RemoteWriteFailed(id));
                    Err(error.into())
                }
            }
        });
        Ok(())
    }

    /// Delete locally (authoritative for the UI) and detach the remote delete
    ///
    /// A remote failure is logged, never surfaced, and never re-creates the
    /// local record.
    pub fn delete(&self, session: &Session, id: &ItemId) -> SyncResult<()> {
        let user = session.user_id()?.clone();
        self.local.delete(id)?;

        let id = *id;
        let remote = Arc::clone(&self.remote);
        self.spawner.spawn("remote delete", async move {
            remote.delete(&user, &id).await?;
            Ok(())
        });
        Ok(())
    }

    /// Full pull-then-push cycle
    ///
    /// The returned result covers the pull only; a fetch failure aborts with
    /// nothing touched locally. The push runs detached.
    pub async fn sync_remote(&self, session: &Session) -> SyncResult<ReconcileSummary> {
        let user = session.user_id()?.clone();
        let snapshot = self.remote.get_all(&user).await?;
        let summary = self.local.reconcile(&snapshot)?;
        tracing::debug!(?summary, "pull reconciled");
        self.events.emit(SyncEvent::PullApplied(summary));

        let worker = PushWorker::new(Arc::clone(&self.local), Arc::clone(&self.remote));
        let events = self.events.clone();
        self.spawner.spawn("push cycle", async move {
            let report = worker.run(&user).await?;
            events.emit(SyncEvent::PushCompleted(report));
            Ok(())
        });
        Ok(summary)
    }

    /// Get one record from local state
    pub fn get(&self, id: &ItemId) -> StoreResult<Option<T>> {
        self.local.get(id)
    }

    /// All records from local state, most recently updated first
    pub fn get_all(&self) -> StoreResult<Vec<T>> {
        self.local.get_all()
    }

    /// Live view of `get_all`
    pub fn watch_all(&self) -> watch::Receiver<Vec<T>> {
        self.local.watch_all()
    }
}

impl<R> SyncCoordinator<PantryItem, SqliteStore<PantryItem>, R>
where
    R: RemoteStore<PantryItem> + 'static,
{
    /// Items stored in the given location
    pub fn get_by_location(&self, location: StorageLocation) -> StoreResult<Vec<PantryItem>> {
        self.local.get_by_location(location)
    }

    /// Name substring search, except a query that looks like a scanned
    /// barcode goes to the exact barcode lookup
    pub fn search(&self, query: &str) -> StoreResult<Vec<PantryItem>> {
        let query = query.trim();
        if looks_like_barcode(query) {
            self.local.get_by_barcode(query)
        } else {
            self.local.search_by_name(query)
        }
    }

    /// Items expiring within the next `days` days, soonest first
    pub fn get_expiring_soon(&self, days: i64) -> StoreResult<Vec<PantryItem>> {
        self.local
            .get_expiring_before(now_millis() + days * DAY_MS)
    }
}

/// More than six characters, all digits: treat as a scanned barcode
fn looks_like_barcode(query: &str) -> bool {
    query.len() > 6 && query.bytes().all(|b| b.is_ascii_digit())
}
