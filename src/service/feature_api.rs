//! The coordinator every client and evaluation call goes through.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{Client, EventHandling};
use crate::config::ApiConfig;
use crate::domain::{
    EvaluationContext, EventBus, Hook, ProviderHandle, ProviderMetadata, ProviderRegistry, Scope,
    ScopeStatus,
};
use crate::error::Result;
use crate::task::TaskSpawner;

/// Process-wide hooks and evaluation context.
///
/// Writers hold the lock only for an assignment or an append; no lock is
/// ever held across an await.
#[derive(Debug, Default)]
struct SharedState {
    hooks: RwLock<Vec<Arc<dyn Hook>>>,
    context: RwLock<EvaluationContext>,
}

/// Orchestration layer for provider lifecycle and shared evaluation state.
///
/// Owns the root [`EventBus`], which aggregates every scope's events, and
/// delegates every provider operation to one [`ProviderRegistry`]. Cheap
/// to clone; clones share everything.
#[derive(Debug, Clone)]
pub struct FeatureApi {
    registry: ProviderRegistry,
    event_bus: EventBus,
    shared: Arc<SharedState>,
    config: Arc<ApiConfig>,
}

impl FeatureApi {
    /// Creates a coordinator on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SwitchyardError::NoRuntime`] outside a tokio
    /// runtime.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self::with_spawner(config, &TaskSpawner::try_current()?))
    }

    /// Creates a coordinator that schedules work on `spawner`'s runtime.
    #[must_use]
    pub fn with_spawner(config: ApiConfig, spawner: &TaskSpawner) -> Self {
        let event_bus = EventBus::new(spawner.sibling());
        let registry = ProviderRegistry::new(event_bus.clone(), spawner);
        Self {
            registry,
            event_bus,
            shared: Arc::new(SharedState::default()),
            config: Arc::new(config),
        }
    }

    /// Configuration this coordinator was built with.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The root bus receiving every scope's events.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Requests a new default provider. Returns before it initializes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SwitchyardError::RegistryShutDown`] after
    /// [`FeatureApi::shutdown`].
    pub fn set_provider(&self, provider: ProviderHandle) -> Result<()> {
        self.registry.set_default_provider(provider)
    }

    /// Requests a new provider for client `name`. Returns before it
    /// initializes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SwitchyardError::InvalidArgument`] for a blank
    /// name and [`crate::SwitchyardError::RegistryShutDown`] after
    /// shutdown.
    pub fn set_named_provider(&self, name: &str, provider: ProviderHandle) -> Result<()> {
        self.registry.set_named_provider(name, provider)
    }

    /// The default scope's active provider.
    #[must_use]
    pub fn provider(&self) -> ProviderHandle {
        self.registry.get_provider(&Scope::Default)
    }

    /// The active provider for `scope`; never waits on initialization.
    #[must_use]
    pub fn get_provider(&self, scope: &Scope) -> ProviderHandle {
        self.registry.get_provider(scope)
    }

    /// Metadata of the active provider for `scope`.
    #[must_use]
    pub fn provider_metadata(&self, scope: &Scope) -> ProviderMetadata {
        self.registry.provider_metadata(scope)
    }

    /// Snapshot of `scope`'s binding.
    #[must_use]
    pub fn status(&self, scope: &Scope) -> ScopeStatus {
        self.registry.status(scope)
    }

    /// Appends `hooks` to the process-wide hook list.
    pub fn add_hooks<I>(&self, hooks: I)
    where
        I: IntoIterator<Item = Arc<dyn Hook>>,
    {
        self.shared.hooks.write().extend(hooks);
    }

    /// Returns a copy of the hook list; later mutations do not show up in it.
    #[must_use]
    pub fn hooks(&self) -> Vec<Arc<dyn Hook>> {
        self.shared.hooks.read().clone()
    }

    /// Removes every hook.
    pub fn clear_hooks(&self) {
        self.shared.hooks.write().clear();
    }

    /// Replaces the process-wide evaluation context.
    pub fn set_context(&self, context: EvaluationContext) {
        *self.shared.context.write() = context;
    }

    /// Returns a copy of the evaluation context.
    #[must_use]
    pub fn context(&self) -> EvaluationContext {
        self.shared.context.read().clone()
    }

    /// A client bound to the default scope.
    #[must_use]
    pub fn default_client(&self) -> Client {
        Client::new(
            self.clone(),
            Scope::Default,
            self.config.default_client_version.clone(),
        )
    }

    /// A client for `name`, or the default client for `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SwitchyardError::InvalidArgument`] for a blank name.
    pub fn client_for(&self, name: Option<&str>) -> Result<Client> {
        Ok(Client::new(
            self.clone(),
            Scope::from_client_name(name)?,
            self.config.default_client_version.clone(),
        ))
    }

    /// A client bound to scope `name`, creating the scope's bus if needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SwitchyardError::InvalidArgument`] for a blank name.
    pub fn client(&self, name: &str) -> Result<Client> {
        self.client_for(Some(name))
    }

    /// Like [`FeatureApi::client`] with an explicit client version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SwitchyardError::InvalidArgument`] for a blank name.
    pub fn client_with_version(&self, name: &str, version: &str) -> Result<Client> {
        Ok(Client::new(
            self.clone(),
            Scope::named(name)?,
            Some(version.to_string()),
        ))
    }

    /// Shuts down every bound provider and stops accepting new ones.
    pub fn shutdown(&self) {
        self.registry.shutdown_all();
    }
}

impl EventHandling for FeatureApi {
    fn handler_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
