//! Domain layer: scopes, providers, events, and the provider registry.
//!
//! This module contains the lifecycle model: provider identity and the
//! collaborator contract, the event bus with its forwarding rules, and the
//! registry that binds providers to scopes and promotes them once they
//! finish initializing.

pub mod evaluation;
pub mod event_bus;
pub mod provider;
pub mod provider_event;
pub mod provider_handle;
pub mod provider_id;
pub mod provider_registry;
pub mod scope;

pub use evaluation::{EvaluationContext, Hook};
pub use event_bus::{EventBus, Handler};
pub use provider::{FeatureProvider, NoOpProvider, ProviderError, ProviderMetadata};
pub use provider_event::{EventDetails, EventKind, FlagMetadata};
pub use provider_handle::{ProviderHandle, ProviderSummary};
pub use provider_id::ProviderId;
pub use provider_registry::{ProviderRegistry, ScopeState, ScopeStatus};
pub use scope::Scope;
