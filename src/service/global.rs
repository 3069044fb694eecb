//! Process-wide coordinator lifecycle.
//!
//! The coordinator is an ordinary value; this module only decides which
//! one the process shares. [`install`] creates it once, [`get`] hands out
//! clones, and [`reset`] swaps in a fresh one for test isolation.

use parking_lot::RwLock;

use super::FeatureApi;
use crate::config::ApiConfig;
use crate::error::{Result, SwitchyardError};

static GLOBAL: RwLock<Option<FeatureApi>> = parking_lot::const_rwlock(None);

/// Installs the process-wide coordinator, or returns the one already
/// installed (in which case `config` is ignored).
///
/// # Errors
///
/// Returns [`SwitchyardError::NoRuntime`] outside a tokio runtime.
pub fn install(config: ApiConfig) -> Result<FeatureApi> {
    let mut slot = GLOBAL.write();
    if let Some(api) = slot.as_ref() {
        return Ok(api.clone());
    }
    let api = FeatureApi::new(config)?;
    *slot = Some(api.clone());
    tracing::info!("feature api installed");
    Ok(api)
}

/// Returns the process-wide coordinator.
///
/// # Errors
///
/// Returns [`SwitchyardError::NotInitialized`] before [`install`].
pub fn get() -> Result<FeatureApi> {
    GLOBAL.read().clone().ok_or(SwitchyardError::NotInitialized)
}

/// Shuts down the installed coordinator's providers and installs a fresh
/// coordinator with the same configuration. Reserved for test harnesses.
///
/// # Errors
///
/// Returns [`SwitchyardError::NoRuntime`] outside a tokio runtime.
pub fn reset() -> Result<FeatureApi> {
    let mut slot = GLOBAL.write();
    let config = match slot.take() {
        Some(previous) => {
            previous.shutdown();
            previous.config().clone()
        }
        None => ApiConfig::default(),
    };
    let api = FeatureApi::new(config)?;
    *slot = Some(api.clone());
    tracing::debug!("feature api reset");
    Ok(api)
}
