//! Insight history model
//!
//! One entry per consume/waste action; the insights screen aggregates these.

use serde::{Deserialize, Serialize};

use super::{now_millis, ItemId, Syncable};

/// What happened to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightAction {
    Consumed,
    Wasted,
}

/// A consume/waste history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightItem {
    /// Unique identifier
    pub id: ItemId,
    /// Name of the pantry item the action applied to
    pub item_name: String,
    /// What happened
    pub action: InsightAction,
    /// Quantity affected
    pub quantity: f64,
    /// Freshness score at the time of the action (0-100)
    pub freshness_score: u8,
    /// When the action happened (Unix ms)
    pub occurred_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl InsightItem {
    /// Record an action against the named item, happening now
    #[must_use]
    pub fn new(item_name: impl Into<String>, action: InsightAction) -> Self {
        let now = now_millis();
        Self {
            id: ItemId::new(),
            item_name: item_name.into(),
            action,
            quantity: 1.0,
            freshness_score: 100,
            occurred_at: now,
            updated_at: now,
        }
    }

    /// Set the affected quantity
    #[must_use]
    pub const fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Set the freshness score, clamped to 0-100
    #[must_use]
    pub fn with_score(mut self, score: u8) -> Self {
        self.freshness_score = score.min(100);
        self
    }
}

impl Syncable for InsightItem {
    const TABLE: &'static str = "insight_items";

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
