//! switchyard demo entry point.
//!
//! Binds an in-memory provider to a named client, waits for it to become
//! ready, relays one configuration change through the provider's own bus,
//! prints the scope status, and shuts everything down.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::mpsc;

use switchyard::ApiConfig;
use switchyard::domain::{
    EventBus, EventDetails, EventKind, FeatureProvider, ProviderError, ProviderHandle,
    ProviderMetadata,
};
use switchyard::service::{EventHandling, global};
use switchyard::telemetry::init_tracing;

const WAIT: Duration = Duration::from_secs(5);

/// Provider that serves from memory and publishes on its own bus.
#[derive(Debug)]
struct DemoProvider {
    bus: EventBus,
}

#[async_trait]
impl FeatureProvider for DemoProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("demo-provider")
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ProviderError> {
        tracing::info!("demo provider released");
        Ok(())
    }

    fn event_source(&self) -> Option<EventBus> {
        Some(self.bus.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;
    init_tracing(&config);

    let api = global::install(config)?;
    let client = api.client("checkout")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<(EventKind, EventDetails)>();
    let ready_tx = tx.clone();
    let changed_tx = tx.clone();
    client
        .on_ready(move |details| {
            let _ = ready_tx.send((EventKind::Ready, details));
        })
        .on_configuration_changed(move |details| {
            let _ = changed_tx.send((EventKind::ConfigurationChanged, details));
        });
    api.on_error(|details| {
        tracing::error!(scope = ?details.scope_name, message = ?details.message, "provider error");
    });
    drop(tx);

    let provider_bus = EventBus::try_current()?;
    let provider = ProviderHandle::new(DemoProvider {
        bus: provider_bus.clone(),
    });
    api.set_named_provider("checkout", provider)?;
    tracing::info!("provider bound; waiting for READY");

    let (kind, details) = tokio::time::timeout(WAIT, rx.recv())
        .await
        .context("timed out waiting for READY")?
        .context("event channel closed")?;
    tracing::info!(%kind, scope = ?details.scope_name, "received");

    provider_bus.emit(
        EventKind::ConfigurationChanged,
        EventDetails::new().with_flags_changed(vec!["new-checkout".to_string()]),
    );
    let (kind, details) = tokio::time::timeout(WAIT, rx.recv())
        .await
        .context("timed out waiting for CONFIGURATION_CHANGED")?
        .context("event channel closed")?;
    tracing::info!(%kind, flags = ?details.flags_changed, "received");

    let status = serde_json::to_string_pretty(&client.status())?;
    println!("{status}");

    api.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
