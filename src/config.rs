//! Client configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                            | Default | Meaning                           |
//! |-------------------------------------|---------|-----------------------------------|
//! | `SWITCHYARD_LOG`                    | `info`  | `EnvFilter` directive for logging |
//! | `SWITCHYARD_LOG_JSON`               | `false` | emit logs as JSON lines           |
//! | `SWITCHYARD_DEFAULT_CLIENT_VERSION` | unset   | version stamped on new clients    |

use crate::error::{Result, SwitchyardError};

/// Top-level client configuration.
///
/// Loaded once at startup via [`ApiConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,

    /// Whether to format log lines as JSON.
    pub log_json: bool,

    /// Version attached to clients created without an explicit version.
    pub default_client_version: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            log_json: false,
            default_client_version: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchyardError::Config`] if `SWITCHYARD_LOG_JSON` is set
    /// to something other than a recognised boolean.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchyardError::Config`] on a malformed boolean.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_filter = lookup("SWITCHYARD_LOG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.log_filter);

        let log_json = match lookup("SWITCHYARD_LOG_JSON") {
            Some(raw) => parse_bool("SWITCHYARD_LOG_JSON", &raw)?,
            None => defaults.log_json,
        };

        let default_client_version =
            lookup("SWITCHYARD_DEFAULT_CLIENT_VERSION").filter(|v| !v.trim().is_empty());

        Ok(Self {
            log_filter,
            log_json,
            default_client_version,
        })
    }
}

/// Parses a boolean flag. Accepts `"true"`, `"1"`, `"false"`, `"0"`
/// (case-insensitive).
fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(SwitchyardError::Config(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}
