//! Push phase: drain dirty records to the remote store
//!
//! One task per record, isolated outcomes: a failed upload leaves that
//! record dirty for the next cycle and nothing else. Whether a record is
//! created or updated is decided by an existence probe, not by any local
//! ledger beyond the sync flag.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::db::LocalStore;
use crate::error::{RemoteError, StoreResult};
use crate::models::{Syncable, UserId};
use crate::remote::RemoteStore;

/// Outcome counts of one push cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Dirty records found at the start of the cycle
    pub attempted: usize,
    /// Records uploaded and flipped to synced
    pub pushed: usize,
    /// Records skipped because the existence probe failed with something
    /// other than not-found
    pub skipped: usize,
    /// Records whose upload failed; they stay dirty
    pub failed: usize,
}

enum Outcome {
    Pushed,
    Skipped,
    Failed,
}

/// Uploads every dirty record for a user, fan-out/fan-in
pub struct PushWorker<T, L, R> {
    local: Arc<L>,
    remote: Arc<R>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, L, R> PushWorker<T, L, R>
where
    T: Syncable,
    L: LocalStore<T>,
    R: RemoteStore<T> + 'static,
{
    #[must_use]
    pub fn new(local: Arc<L>, remote: Arc<R>) -> Self {
        Self {
            local,
            remote,
            _marker: PhantomData,
        }
    }

    /// Push every dirty record; per-item failures are isolated
    pub async fn run(&self, user: &UserId) -> StoreResult<PushReport> {
        let dirty = self.local.get_unsynced()?;
        let mut report = PushReport {
            attempted: dirty.len(),
            ..PushReport::default()
        };
        if dirty.is_empty() {
            return Ok(report);
        }

        let mut tasks = JoinSet::new();
        for record in dirty {
            let local = Arc::clone(&self.local);
            let remote = Arc::clone(&self.remote);
            let user = user.clone();
            tasks.spawn(async move {
                push_one(local.as_ref(), remote.as_ref(), &user, record).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Outcome::Pushed) => report.pushed += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Err(join_error) => {
                    tracing::warn!(%join_error, "push task aborted");
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(?report, "push cycle finished");
        Ok(report)
    }
}

async fn push_one<T, L, R>(local: &L, remote: &R, user: &UserId, record: T) -> Outcome
where
    T: Syncable,
    L: LocalStore<T>,
    R: RemoteStore<T>,
{
    let id = *record.id();
    let stamp = record.updated_at();

    let exists = match remote.get_one(user, &id).await {
        Ok(_) => true,
        Err(RemoteError::NotFound) => false,
        Err(error) => {
            // A transient outage must not be read as "never created":
            // creating here could duplicate the record once it clears.
            tracing::warn!(%id, %error, "existence probe failed, skipping this cycle");
            return Outcome::Skipped;
        }
    };

    let result = if exists {
        remote.update(user, &record).await
    } else {
        remote.create(user, &record).await
    };

    match result {
        Ok(_) => match local.mark_synced(&id, stamp) {
            Ok(_) => Outcome::Pushed,
            Err(error) => {
                tracing::warn!(%id, %error, "pushed record but could not flip its sync flag");
                Outcome::Failed
            }
        },
        Err(error) => {
            tracing::warn!(%id, %error, "push failed, record stays dirty");
            Outcome::Failed
        }
    }
}
