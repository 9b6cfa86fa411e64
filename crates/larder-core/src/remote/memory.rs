//! In-memory remote store
//!
//! Backs the engine tests and offline development. Supports per-id failure
//! injection so partial-push outcomes can be exercised deterministically:
//! an injected error keeps firing until the entry is cleared, matching a
//! remote that is consistently unhealthy for that record.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{RemoteError, RemoteResult};
use crate::models::{ItemId, Syncable, UserId};

use super::RemoteStore;

/// In-process implementation of [`RemoteStore`]
pub struct MemoryRemoteStore<T> {
    collections: Mutex<HashMap<UserId, HashMap<ItemId, T>>>,
    probe_errors: Mutex<HashMap<ItemId, RemoteError>>,
    write_errors: Mutex<HashMap<ItemId, RemoteError>>,
    pull_error: Mutex<Option<RemoteError>>,
}

impl<T: Syncable> MemoryRemoteStore<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            probe_errors: Mutex::new(HashMap::new()),
            write_errors: Mutex::new(HashMap::new()),
            pull_error: Mutex::new(None),
        }
    }

    /// Make `get_one` for this id fail with the given error
    pub fn fail_probe(&self, id: ItemId, error: RemoteError) {
        self.lock(&self.probe_errors).insert(id, error);
    }

    /// Make `create`/`update`/`delete` for this id fail with the given error
    pub fn fail_write(&self, id: ItemId, error: RemoteError) {
        self.lock(&self.write_errors).insert(id, error);
    }

    /// Make the next `get_all` fail with the given error (one-shot)
    pub fn fail_next_pull(&self, error: RemoteError) {
        *self.lock(&self.pull_error) = Some(error);
    }

    /// Number of records stored for the user
    #[must_use]
    pub fn record_count(&self, user: &UserId) -> usize {
        self.lock(&self.collections)
            .get(user)
            .map_or(0, HashMap::len)
    }

    /// Stored copy of a record, for assertions
    #[must_use]
    pub fn get_record(&self, user: &UserId, id: &ItemId) -> Option<T> {
        self.lock(&self.collections)
            .get(user)
            .and_then(|collection| collection.get(id))
            .cloned()
    }

    fn lock<'a, V>(&self, mutex: &'a Mutex<V>) -> MutexGuard<'a, V> {
        mutex.lock().expect("memory store mutex poisoned")
    }

    fn injected(&self, map: &Mutex<HashMap<ItemId, RemoteError>>, id: &ItemId) -> RemoteResult<()> {
        match self.lock(map).get(id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl<T: Syncable> Default for MemoryRemoteStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Syncable> RemoteStore<T> for MemoryRemoteStore<T> {
    async fn create(&self, user: &UserId, record: &T) -> RemoteResult<T> {
        self.injected(&self.write_errors, record.id())?;
        let mut collections = self.lock(&self.collections);
        let collection = collections.entry(user.clone()).or_default();
        if collection.contains_key(record.id()) {
            return Err(RemoteError::Conflict);
        }
        collection.insert(*record.id(), record.clone());
        Ok(record.clone())
    }

    async fn get_all(&self, user: &UserId) -> RemoteResult<Vec<T>> {
        if let Some(error) = self.lock(&self.pull_error).take() {
            return Err(error);
        }
        let mut records: Vec<T> = self
            .lock(&self.collections)
            .get(user)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|record| std::cmp::Reverse(record.updated_at()));
        Ok(records)
    }

    async fn get_one(&self, user: &UserId, id: &ItemId) -> RemoteResult<T> {
        self.injected(&self.probe_errors, id)?;
        self.lock(&self.collections)
            .get(user)
            .and_then(|collection| collection.get(id))
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    async fn update(&self, user: &UserId, record: &T) -> RemoteResult<T> {
        self.injected(&self.write_errors, record.id())?;
        let mut collections = self.lock(&self.collections);
        let collection = collections
            .get_mut(user)
            .filter(|collection| collection.contains_key(record.id()))
            .ok_or(RemoteError::NotFound)?;
        collection.insert(*record.id(), record.clone());
        Ok(record.clone())
    }

    async fn delete(&self, user: &UserId, id: &ItemId) -> RemoteResult<()> {
        self.injected(&self.write_errors, id)?;
        if let Some(collection) = self.lock(&self.collections).get_mut(user) {
            collection.remove(id);
        }
        Ok(())
    }

    async fn delete_all(&self, user: &UserId) -> RemoteResult<()> {
        self.lock(&self.collections).remove(user);
        Ok(())
    }
}
