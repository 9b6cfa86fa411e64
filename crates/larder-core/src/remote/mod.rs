//! Remote document-store clients
//!
//! The cloud side of the sync engine: one collection per entity family,
//! scoped to the authenticated user. The engine only ever talks to this
//! trait; it never blocks the UI on any of these calls.

mod http;
mod memory;

pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;

use async_trait::async_trait;

use crate::error::RemoteResult;
use crate::models::{ItemId, Syncable, UserId};

/// Per-user remote collection contract
#[async_trait]
pub trait RemoteStore<T: Syncable>: Send + Sync {
    /// Create a record; fails with `Conflict` if the id already exists
    async fn create(&self, user: &UserId, record: &T) -> RemoteResult<T>;

    /// Fetch the complete record set for the user
    async fn get_all(&self, user: &UserId) -> RemoteResult<Vec<T>>;

    /// Fetch one record; fails with `NotFound` if absent
    async fn get_one(&self, user: &UserId, id: &ItemId) -> RemoteResult<T>;

    /// Overwrite an existing record; fails with `NotFound` if absent
    async fn update(&self, user: &UserId, record: &T) -> RemoteResult<T>;

    /// Delete a record; deleting an absent id is not an error
    async fn delete(&self, user: &UserId, id: &ItemId) -> RemoteResult<()>;

    /// Delete the user's entire collection
    async fn delete_all(&self, user: &UserId) -> RemoteResult<()>;
}
