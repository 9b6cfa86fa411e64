//! Per-record conflict decision
//!
//! Pure: applied inside the reconcile transaction, it sees only the incoming
//! timestamp and the local row's sync bookkeeping, never the payloads.

/// Sync bookkeeping of an existing local row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalMeta {
    /// Last-write timestamp of the local row (Unix ms)
    pub updated_at: i64,
    /// True iff the row is known to match a prior server state
    pub is_synced: bool,
}

/// What to do with one incoming remote record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Insert or overwrite locally and mark the row synced
    Accept,
    /// Leave the local row untouched; it carries a pending edit the incoming
    /// copy does not reflect
    KeepLocal,
}

/// Decide whether an incoming remote record overwrites the local row
///
/// Remote wins on a strictly newer timestamp, or whenever the local row is
/// clean (a clean row already matches some server state, so nothing is
/// lost). An equal timestamp is not "newer": a dirty local row survives it.
#[must_use]
pub const fn resolve(remote_updated_at: i64, local: Option<LocalMeta>) -> Resolution {
    match local {
        None => Resolution::Accept,
        Some(meta) => {
            if remote_updated_at > meta.updated_at || meta.is_synced {
                Resolution::Accept
            } else {
                Resolution::KeepLocal
            }
        }
    }
}
