//! Tracing subscriber installation.

use tracing_subscriber::EnvFilter;

use crate::config::ApiConfig;

/// Installs a global `tracing` subscriber configured from `config`.
///
/// The filter is taken from `config.log_filter`; if that directive does
/// not parse, `RUST_LOG` is tried, then `info`. Returns `false` when a
/// global subscriber was already installed (the call is then a no-op).
pub fn init_tracing(config: &ApiConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_filter)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}
