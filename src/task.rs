//! Fire-and-forget task submission.
//!
//! [`TaskSpawner`] is the only way this crate schedules background work:
//! provider initialization, provider shutdown, and event handler
//! invocations. Submitted work is detached the moment it is spawned: the
//! join handle is dropped, nothing ever waits on it, and nothing cancels
//! it. Once a spawner is closed it refuses new work.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Handle;

use crate::error::{Result, SwitchyardError};

/// Detached task submission bound to a tokio runtime.
///
/// Cloning shares the open/closed flag; [`TaskSpawner::sibling`] creates a
/// spawner on the same runtime with an independent flag.
#[derive(Debug, Clone)]
pub struct TaskSpawner {
    handle: Handle,
    accepting: Arc<AtomicBool>,
}

impl TaskSpawner {
    /// Creates a spawner that submits work to `handle`.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Creates a spawner bound to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchyardError::NoRuntime`] when called outside a tokio
    /// runtime.
    pub fn try_current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SwitchyardError::NoRuntime(e.to_string()))
    }

    /// Returns a new open spawner on the same runtime.
    #[must_use]
    pub fn sibling(&self) -> Self {
        Self::new(self.handle.clone())
    }

    /// Submits an async task. Returns `false` if the spawner is closed.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.is_accepting() {
            tracing::warn!(task = name, "spawner closed; task rejected");
            return false;
        }
        drop(self.handle.spawn(task));
        true
    }

    /// Submits a blocking job to the runtime's growable blocking pool.
    /// Returns `false` if the spawner is closed.
    pub fn spawn_blocking<F>(&self, name: &'static str, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_accepting() {
            tracing::warn!(task = name, "spawner closed; job rejected");
            return false;
        }
        drop(self.handle.spawn_blocking(job));
        true
    }

    /// Stops accepting new work. Already-submitted work runs to completion.
    pub fn close(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Returns `true` while the spawner accepts new work.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }
}
