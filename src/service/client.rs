//! Named-client facade.
//!
//! A [`Client`] is what application code holds: it knows its scope, reads
//! the scope's active provider on demand, and registers handlers on the
//! scope's own bus rather than the root bus.

use super::{EventHandling, FeatureApi};
use crate::domain::{EventBus, ProviderHandle, ProviderMetadata, Scope, ScopeStatus};

/// Handle onto one scope of a [`FeatureApi`].
#[derive(Debug, Clone)]
pub struct Client {
    api: FeatureApi,
    scope: Scope,
    version: Option<String>,
    bus: EventBus,
}

impl Client {
    pub(crate) fn new(api: FeatureApi, scope: Scope, version: Option<String>) -> Self {
        let bus = api.registry().bus(&scope);
        Self {
            api,
            scope,
            version,
            bus,
        }
    }

    /// The scope this client reads from.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Client name, `None` for the default client.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.scope.name()
    }

    /// Client version, if one was given or configured.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The provider currently serving this client.
    #[must_use]
    pub fn provider(&self) -> ProviderHandle {
        self.api.get_provider(&self.scope)
    }

    /// Metadata of the provider currently serving this client.
    #[must_use]
    pub fn provider_metadata(&self) -> ProviderMetadata {
        self.api.provider_metadata(&self.scope)
    }

    /// Snapshot of this client's scope.
    #[must_use]
    pub fn status(&self) -> ScopeStatus {
        self.api.status(&self.scope)
    }
}

impl EventHandling for Client {
    fn handler_bus(&self) -> &EventBus {
        &self.bus
    }
}
