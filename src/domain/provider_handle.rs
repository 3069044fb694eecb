//! Identity-carrying provider handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::provider::{FeatureProvider, NoOpProvider, ProviderMetadata};
use super::{EventBus, ProviderId};

/// Shared handle to a provider instance.
///
/// Equality is reference identity: handles wrapping the same allocation
/// are the same provider, even when wrapped separately through
/// [`ProviderHandle::from_arc`], while two allocations with equal
/// configurations never collapse into one binding.
#[derive(Debug, Clone)]
pub struct ProviderHandle {
    id: ProviderId,
    provider: Arc<dyn FeatureProvider>,
    created_at: DateTime<Utc>,
}

impl ProviderHandle {
    /// Moves `provider` into a new allocation.
    #[must_use]
    pub fn new<P>(provider: P) -> Self
    where
        P: FeatureProvider + 'static,
    {
        Self::from_arc(Arc::new(provider))
    }

    /// Wraps an already shared provider; the identity follows the
    /// allocation.
    #[must_use]
    pub fn from_arc(provider: Arc<dyn FeatureProvider>) -> Self {
        Self {
            id: ProviderId::of(&provider),
            provider,
            created_at: Utc::now(),
        }
    }

    /// A fresh no-op stand-in.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(NoOpProvider)
    }

    /// Identity of the wrapped instance.
    #[must_use]
    pub const fn id(&self) -> ProviderId {
        self.id
    }

    /// The wrapped provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn FeatureProvider> {
        &self.provider
    }

    /// Shortcut for the provider's metadata.
    #[must_use]
    pub fn metadata(&self) -> ProviderMetadata {
        self.provider.metadata()
    }

    /// Shortcut for the provider's own event bus.
    #[must_use]
    pub fn event_source(&self) -> Option<EventBus> {
        self.provider.event_source()
    }

    /// When this handle was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl PartialEq for ProviderHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProviderHandle {}

/// Lightweight, serializable description of a bound provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    /// Provider identity.
    pub id: ProviderId,
    /// Provider name from its metadata.
    pub name: String,
    /// Handle creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&ProviderHandle> for ProviderSummary {
    fn from(handle: &ProviderHandle) -> Self {
        Self {
            id: handle.id,
            name: handle.metadata().name,
            created_at: handle.created_at,
        }
    }
}
