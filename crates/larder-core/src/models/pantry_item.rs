//! Pantry item model

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{now_millis, ItemId, Syncable};

/// Where an item is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLocation {
    Fridge,
    Freezer,
    Pantry,
}

impl StorageLocation {
    /// The serialized form, as stored in the payload column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fridge => "fridge",
            Self::Freezer => "freezer",
            Self::Pantry => "pantry",
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item tracked in the pantry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItem {
    /// Unique identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Scanned barcode, if the item was captured that way
    pub barcode: Option<String>,
    /// Storage location
    pub location: StorageLocation,
    /// Remaining quantity
    pub quantity: f64,
    /// Unit for `quantity` ("pcs", "g", "ml", ...)
    pub unit: String,
    /// Expiry date (Unix ms), if known
    pub expires_at: Option<i64>,
    /// Remote URL of the item photo, if one was uploaded
    pub image_url: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl PantryItem {
    /// Create a new item with the given name and location
    #[must_use]
    pub fn new(name: impl Into<String>, location: StorageLocation) -> Self {
        let now = now_millis();
        Self {
            id: ItemId::new(),
            name: name.into(),
            barcode: None,
            location,
            quantity: 1.0,
            unit: "pcs".to_string(),
            expires_at: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the barcode
    #[must_use]
    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Set quantity and unit
    #[must_use]
    pub fn with_quantity(mut self, quantity: f64, unit: impl Into<String>) -> Self {
        self.quantity = quantity;
        self.unit = unit.into();
        self
    }

    /// Set the expiry date (Unix ms)
    #[must_use]
    pub const fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True when the item has an expiry date at or before `now`
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// True when the item expires within `window_ms` of `now`
    #[must_use]
    pub fn expires_within(&self, now: i64, window_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now + window_ms)
    }
}

impl Syncable for PantryItem {
    const TABLE: &'static str = "pantry_items";

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}
