//! Sync event side-channel
//!
//! Single-consumer ordered queue a UI layer can drain to refresh itself or
//! surface quiet background-sync diagnostics. Emission is best-effort: once
//! the consumer is dropped, events are discarded.

use tokio::sync::mpsc;

use crate::db::ReconcileSummary;
use crate::models::ItemId;

use super::push::PushReport;

/// Notification emitted by the sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A background remote write for this record succeeded
    RemoteWriteConfirmed(ItemId),
    /// A background remote write failed; the record stays dirty
    RemoteWriteFailed(ItemId),
    /// A pull cycle committed its reconcile transaction
    PullApplied(ReconcileSummary),
    /// A push cycle finished
    PushCompleted(PushReport),
}

/// Sending half, cloned into background tasks
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl EventSink {
    pub(crate) fn emit(&self, event: SyncEvent) {
        // Nobody listening is not an error
        let _ = self.tx.send(event);
    }
}

/// Receiving half, held by the single consumer
pub struct SyncEvents {
    rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl SyncEvents {
    /// Next event, or `None` once the engine is gone
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant
    pub fn try_recv(&mut self) -> Option<SyncEvent> {
        self.rx.try_recv().ok()
    }
}

pub(crate) fn channel() -> (EventSink, SyncEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, SyncEvents { rx })
}
