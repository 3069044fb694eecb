//! Reference identity of provider instances.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::FeatureProvider;

/// Address of a provider allocation.
///
/// Two handles share an id exactly when they point at the same
/// `Arc<dyn FeatureProvider>` allocation, however many times it was
/// wrapped. The id is only meaningful while some handle keeps the
/// allocation alive; the registry never keys on an id it does not hold a
/// handle for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProviderId(usize);

impl ProviderId {
    /// Identity of the allocation behind `provider`.
    #[must_use]
    pub fn of(provider: &Arc<dyn FeatureProvider>) -> Self {
        Self(Arc::as_ptr(provider).cast::<()>().addr())
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
