//! Domain models for Larder

mod insight_item;
mod pantry_item;

pub use insight_item::{InsightAction, InsightItem};
pub use pantry_item::{PantryItem, StorageLocation};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a syncable item, using UUID v7 (time-sortable)
///
/// Client-generated, never reassigned; the join key between the local row
/// and the remote document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new unique item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Opaque identifier of an authenticated user, as issued by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape shared by every record the sync engine manages
///
/// The engine only reads the id and the `updated_at` logical clock; all other
/// payload fields are opaque to it. The local-only synced flag is a column
/// owned by the local store, deliberately not part of the record.
pub trait Syncable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Local table and remote collection name for this entity family
    const TABLE: &'static str;

    /// Stable, immutable identifier
    fn id(&self) -> &ItemId;

    /// Last-write timestamp (Unix ms); larger means newer, nothing more
    fn updated_at(&self) -> i64;

    /// Stamp `updated_at` with the current time
    fn touch(&mut self);
}

/// Current Unix timestamp in milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_unique() {
        let id1 = ItemId::new();
        let id2 = ItemId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_item_id_parse() {
        let id = ItemId::new();
        let parsed: ItemId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_item_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<ItemId>().is_err());
    }

    #[test]
    fn test_user_id_display() {
        let user = UserId::new("auth0|abc123");
        assert_eq!(user.as_str(), "auth0|abc123");
        assert_eq!(user.to_string(), "auth0|abc123");
    }
}
