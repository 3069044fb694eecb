//! Per-scope event dispatch.
//!
//! [`EventBus`] keeps, for every [`EventKind`], the ordered list of
//! handlers registered for it. Emitting an event submits one detached
//! blocking job per handler through the bus's [`TaskSpawner`]; a handler
//! that panics is caught and logged without affecting its siblings or the
//! emitter.

use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{EventDetails, EventKind};
use crate::error::{Result, SwitchyardError, panic_message};
use crate::task::TaskSpawner;

/// A subscriber callback.
pub type Handler = Arc<dyn Fn(EventDetails) + Send + Sync>;

/// One handler list per event kind, selected by exhaustive match.
#[derive(Default)]
struct HandlerTable {
    ready: RwLock<Vec<Handler>>,
    configuration_changed: RwLock<Vec<Handler>>,
    error: RwLock<Vec<Handler>>,
    stale: RwLock<Vec<Handler>>,
}

impl HandlerTable {
    fn slot(&self, kind: EventKind) -> &RwLock<Vec<Handler>> {
        match kind {
            EventKind::Ready => &self.ready,
            EventKind::ConfigurationChanged => &self.configuration_changed,
            EventKind::Error => &self.error,
            EventKind::Stale => &self.stale,
        }
    }
}

struct Inner {
    id: uuid::Uuid,
    handlers: HandlerTable,
    /// `(source bus, tag)` pairs already forwarded into this bus.
    forwards: Mutex<HashSet<(uuid::Uuid, Option<String>)>>,
    spawner: TaskSpawner,
}

/// Multi-subscriber event bus for one scope (or one provider).
///
/// Cheap to clone; clones share handlers and identity.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Creates an empty bus dispatching through `spawner`.
    #[must_use]
    pub fn new(spawner: TaskSpawner) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: uuid::Uuid::new_v4(),
                handlers: HandlerTable::default(),
                forwards: Mutex::new(HashSet::new()),
                spawner,
            }),
        }
    }

    /// Creates an empty bus on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchyardError::NoRuntime`] outside a tokio runtime.
    pub fn try_current() -> Result<Self> {
        TaskSpawner::try_current().map(Self::new)
    }

    /// Identity of this bus, shared by its clones.
    #[must_use]
    pub fn id(&self) -> uuid::Uuid {
        self.inner.id
    }

    /// Appends `handler` to the list for `kind`.
    pub fn register_handler<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(EventDetails) + Send + Sync + 'static,
    {
        self.register_arc(kind, Arc::new(handler));
    }

    /// Appends an already shared handler to the list for `kind`.
    pub fn register_arc(&self, kind: EventKind, handler: Handler) {
        self.inner.handlers.slot(kind).write().push(handler);
    }

    /// Dispatches `details` to every handler currently registered for
    /// `kind`, each as an independent job.
    ///
    /// Returns the number of handler invocations submitted. Completion
    /// order is unspecified.
    pub fn emit(&self, kind: EventKind, details: EventDetails) -> usize {
        let handlers: Vec<Handler> = self.inner.handlers.slot(kind).read().clone();
        let mut submitted = 0;
        for handler in handlers {
            let details = details.clone();
            let accepted = self.inner.spawner.spawn_blocking("event-handler", move || {
                let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| handler(details)));
                if let Err(payload) = outcome {
                    let err = SwitchyardError::Handler {
                        kind,
                        message: panic_message(&*payload),
                    };
                    tracing::error!(error = %err, %kind, "event handler failed");
                }
            });
            if accepted {
                submitted += 1;
            }
        }
        tracing::trace!(bus = %self.inner.id, %kind, submitted, "event emitted");
        submitted
    }

    /// Re-emits every event of `source` on this bus with `scope_name`
    /// replaced by `tag`.
    ///
    /// Forwarding is permanent. Establishing the same `(source, tag)` pair
    /// twice is a no-op, as is forwarding a bus into itself. Returns
    /// `true` when a new forward was established.
    pub fn forward(&self, source: &EventBus, tag: Option<String>) -> bool {
        if source.id() == self.id() {
            tracing::warn!(bus = %self.inner.id, "refusing to forward a bus into itself");
            return false;
        }
        if !self.inner.forwards.lock().insert((source.id(), tag.clone())) {
            return false;
        }
        for kind in EventKind::ALL {
            let target = self.clone();
            let tag = tag.clone();
            source.register_handler(kind, move |details| {
                target.emit(kind, details.tagged(tag.clone()));
            });
        }
        tracing::debug!(
            source = %source.id(),
            target = %self.inner.id,
            tag = tag.as_deref().unwrap_or("<default>"),
            "event forwarding established"
        );
        true
    }

    /// Returns the number of handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner.handlers.slot(kind).read().len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("id", &self.inner.id)
            .field("ready", &self.handler_count(EventKind::Ready))
            .field(
                "configuration_changed",
                &self.handler_count(EventKind::ConfigurationChanged),
            )
            .field("error", &self.handler_count(EventKind::Error))
            .field("stale", &self.handler_count(EventKind::Stale))
            .finish_non_exhaustive()
    }
}
