//! Service layer: the process-wide coordinator and its client facades.

pub mod client;
pub mod event_handling;
pub mod feature_api;
pub mod global;

pub use client::Client;
pub use event_handling::EventHandling;
pub use feature_api::FeatureApi;
