//! # switchyard
//!
//! Provider lifecycle and event propagation for a feature-flag SDK.
//!
//! Applications bind flag providers to the default scope or to named
//! client scopes. Binding returns immediately; each provider initializes in
//! the background and is promoted atomically once ready, with a READY (or
//! ERROR) event published on the scope's bus and on the root bus. Events a
//! provider emits on its own bus are forwarded to both, tagged with the
//! scope name.
//!
//! ## Architecture
//!
//! ```text
//! Application code
//!     │
//!     ├── FeatureApi / Client (service/)
//!     ├── global install / get / reset (service/)
//!     │
//!     ├── ProviderRegistry (domain/)
//!     │       ├── default slot + named slots
//!     │       └── per-provider binding counts
//!     │
//!     ├── EventBus per scope + root EventBus (domain/)
//!     │
//!     └── TaskSpawner (tokio runtime)
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod task;
pub mod telemetry;

pub use config::ApiConfig;
pub use error::{Result, SwitchyardError};
pub use service::{Client, EventHandling, FeatureApi};
