//! Detached task supervision
//!
//! Background remote writes outlive the call (and the screen) that triggered
//! them: the local optimistic state is already committed and must eventually
//! reconcile. A failed task is logged and never takes a sibling down.

use std::future::Future;

use tokio::runtime::Handle;

use crate::error::SyncError;

/// Process-scoped spawner for fire-and-forget sync work
#[derive(Clone)]
pub struct TaskSpawner {
    handle: Handle,
}

impl TaskSpawner {
    /// Capture the current Tokio runtime
    ///
    /// Panics outside a runtime, like `Handle::current`.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Detach a task; its error is logged, never propagated. Panics are
    /// confined to the task by the runtime.
    pub(crate) fn spawn<F>(&self, task: &'static str, fut: F)
    where
        F: Future<Output = Result<(), SyncError>> + Send + 'static,
    {
        self.handle.spawn(async move {
            if let Err(error) = fut.await {
                tracing::warn!(task, %error, "background sync task failed");
            }
        });
    }
}
