//! Chainable handler registration shared by the API and its clients.

use crate::domain::{EventBus, EventDetails, EventKind};

/// Registration surface for provider lifecycle events.
///
/// Implementors only name the bus handlers land on; every `on_*` method
/// returns `self` so registrations chain.
pub trait EventHandling {
    /// The bus that receives registrations made through this value.
    fn handler_bus(&self) -> &EventBus;

    /// Registers `handler` for `kind`.
    fn on<F>(&self, kind: EventKind, handler: F) -> &Self
    where
        F: Fn(EventDetails) + Send + Sync + 'static,
        Self: Sized,
    {
        self.handler_bus().register_handler(kind, handler);
        self
    }

    /// Registers a READY handler.
    fn on_ready<F>(&self, handler: F) -> &Self
    where
        F: Fn(EventDetails) + Send + Sync + 'static,
        Self: Sized,
    {
        self.on(EventKind::Ready, handler)
    }

    /// Registers a CONFIGURATION_CHANGED handler.
    fn on_configuration_changed<F>(&self, handler: F) -> &Self
    where
        F: Fn(EventDetails) + Send + Sync + 'static,
        Self: Sized,
    {
        self.on(EventKind::ConfigurationChanged, handler)
    }

    /// Registers an ERROR handler.
    fn on_error<F>(&self, handler: F) -> &Self
    where
        F: Fn(EventDetails) + Send + Sync + 'static,
        Self: Sized,
    {
        self.on(EventKind::Error, handler)
    }

    /// Registers a STALE handler.
    fn on_stale<F>(&self, handler: F) -> &Self
    where
        F: Fn(EventDetails) + Send + Sync + 'static,
        Self: Sized,
    {
        self.on(EventKind::Stale, handler)
    }
}
