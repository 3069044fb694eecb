//! The provider collaborator contract.
//!
//! A provider is a pluggable backend that owns its own lifecycle. This
//! crate only drives that lifecycle; evaluation itself happens in the
//! layer above, against whatever provider [`super::ProviderRegistry`]
//! hands out.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EventBus;

/// Descriptive metadata reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Human-readable provider name.
    pub name: String,
}

impl ProviderMetadata {
    /// Creates metadata with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Failure reported by a provider from `initialize()` or `shutdown()`.
///
/// The message is carried verbatim in the ERROR event that follows a
/// failed initialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Failure description.
    pub message: String,
}

impl ProviderError {
    /// Creates an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A pluggable flag-evaluation backend.
///
/// Both lifecycle methods default to immediate success. Providers that
/// publish their own events return their bus from
/// [`FeatureProvider::event_source`]; it must be the same bus on every
/// call.
#[async_trait]
pub trait FeatureProvider: Send + Sync + fmt::Debug {
    /// Describes this provider.
    fn metadata(&self) -> ProviderMetadata;

    /// Prepares the provider for serving.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider cannot start.
    async fn initialize(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Releases provider resources.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when teardown fails; the failure is
    /// logged and otherwise ignored.
    async fn shutdown(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// The provider's own event bus, if it emits events.
    fn event_source(&self) -> Option<EventBus> {
        None
    }
}

/// Stand-in bound to every scope before a real provider is promoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProvider;

impl NoOpProvider {
    /// Name reported in this provider's metadata.
    pub const NAME: &'static str = "No-op Provider";
}

#[async_trait]
impl FeatureProvider for NoOpProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new(Self::NAME)
    }
}
