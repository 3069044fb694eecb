//! Client error types with stable numeric codes.
//!
//! [`SwitchyardError`] is the central error type for the crate. Only the
//! synchronous variants ever reach a caller; the asynchronous ones are
//! constructed on worker tasks, logged, and (for initialization failures)
//! surfaced as an ERROR event instead.

use crate::domain::EventKind;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SwitchyardError>;

/// Error enum for the provider lifecycle and event core.
///
/// # Error Code Ranges
///
/// | Range     | Category          | Surfaced as                 |
/// |-----------|-------------------|-----------------------------|
/// | 1000–1999 | Validation        | `Err` to the caller         |
/// | 2000–2999 | Lifecycle / State | `Err` to the caller         |
/// | 3000–3999 | Async collaborator| log line (+ ERROR event)    |
/// | 4000–4999 | Configuration     | `Err` to the caller         |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwitchyardError {
    /// A setter or lookup received an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The registry was shut down and no longer accepts work.
    #[error("provider registry has been shut down")]
    RegistryShutDown,

    /// The process-wide coordinator has not been installed yet.
    #[error("feature api not initialized; call global::install first")]
    NotInitialized,

    /// A spawner or event bus was created outside a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    /// A provider failed (or panicked) during `initialize()`.
    #[error("provider {provider} failed to initialize: {message}")]
    ProviderInit {
        /// Provider name from its metadata.
        provider: String,
        /// Failure message reported by the provider.
        message: String,
    },

    /// A provider failed (or panicked) during `shutdown()`.
    #[error("provider {provider} failed to shut down: {message}")]
    ProviderShutdown {
        /// Provider name from its metadata.
        provider: String,
        /// Failure message reported by the provider.
        message: String,
    },

    /// An event handler panicked while processing an event.
    #[error("{kind} handler failed: {message}")]
    Handler {
        /// Event kind being dispatched.
        kind: EventKind,
        /// Panic payload rendered as text.
        message: String,
    },

    /// A configuration value could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SwitchyardError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidArgument(_) => 1001,
            Self::RegistryShutDown => 1002,
            Self::NotInitialized => 2001,
            Self::NoRuntime(_) => 2002,
            Self::ProviderInit { .. } => 3001,
            Self::ProviderShutdown { .. } => 3002,
            Self::Handler { .. } => 3003,
            Self::Config(_) => 4001,
        }
    }
}

/// Renders a `catch_unwind` payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
