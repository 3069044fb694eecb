//! Provider bindings with asynchronous initialization and atomic swap.
//!
//! [`ProviderRegistry`] owns one provider slot per scope: the default
//! slot behind its own lock, named slots as individually locked entries of
//! a [`DashMap`]. Operations on different scopes never contend.
//!
//! # Promotion protocol
//!
//! `set_provider` records the provider as the scope's pending provider and
//! spawns its initialization. When initialization succeeds the provider is
//! promoted only if it is *still* the scope's pending provider; a newer
//! `set_provider` call for the same scope makes the older result stale and
//! it is dropped. Last writer wins. A stale *failure* is still reported as
//! an ERROR event; it just never touches the slot.
//!
//! Every active binding holds one count on its provider. A provider is
//! shut down exactly when its count drops to zero, and `initialize()` is
//! skipped for a provider that already has a count.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;

use super::provider::{ProviderError, ProviderMetadata};
use super::provider_handle::ProviderSummary;
use super::{EventBus, EventDetails, EventKind, ProviderHandle, ProviderId, Scope};
use crate::error::{Result, SwitchyardError, panic_message};
use crate::task::TaskSpawner;

/// Lifecycle state of one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeState {
    /// No provider was ever promoted; the scope serves its fallback.
    #[default]
    Unbound,
    /// A provider is pending initialization.
    Initializing,
    /// The active provider finished initializing.
    Ready,
    /// The last initialization failed; the previous provider still serves.
    Error,
}

/// Binding between one scope and its providers.
#[derive(Debug, Default)]
struct ProviderSlot {
    /// `None` means the scope falls back (named → default, default → no-op).
    active: Option<ProviderHandle>,
    /// Most recently requested provider not yet promoted.
    pending: Option<ProviderHandle>,
    state: ScopeState,
    promoted_at: Option<DateTime<Utc>>,
}

/// Outcome of an initialization attempt against a slot.
enum Promotion {
    /// The provider was superseded; nothing changed.
    Stale,
    /// The provider is now active; `previous` lost its binding.
    Promoted { previous: Option<ProviderHandle> },
}

/// Serializable snapshot of one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeStatus {
    /// The scope described.
    pub scope: Scope,
    /// Current lifecycle state.
    pub state: ScopeState,
    /// Provider that `get_provider` returns for this scope.
    pub active: ProviderSummary,
    /// Provider still initializing, if any.
    pub pending: Option<ProviderSummary>,
    /// When the active provider was promoted.
    pub promoted_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct RegistryInner {
    default_slot: RwLock<ProviderSlot>,
    named: DashMap<String, ProviderSlot>,
    default_bus: EventBus,
    named_buses: DashMap<String, EventBus>,
    root_bus: EventBus,
    /// Active-binding count per provider.
    bindings: DashMap<ProviderId, usize>,
    noop: ProviderHandle,
    /// Runs initialization and shutdown; closed by `shutdown_all`.
    lifecycle: TaskSpawner,
    /// Shared by every bus this registry creates.
    events: TaskSpawner,
    shut_down: AtomicBool,
}

/// Central store for all provider bindings.
///
/// Cheap to clone; clones share state.
///
/// # Concurrency
///
/// - `get_provider` only takes a short read lock on one slot.
/// - Writes to different scopes are concurrent.
/// - Promotion within one scope is linearized by the slot lock.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    inner: Arc<RegistryInner>,
}

impl ProviderRegistry {
    /// Creates a registry that reports to `root_bus` and schedules all
    /// background work on `spawner`'s runtime.
    #[must_use]
    pub fn new(root_bus: EventBus, spawner: &TaskSpawner) -> Self {
        let events = spawner.sibling();
        Self {
            inner: Arc::new(RegistryInner {
                default_slot: RwLock::new(ProviderSlot::default()),
                named: DashMap::new(),
                default_bus: EventBus::new(events.clone()),
                named_buses: DashMap::new(),
                root_bus,
                bindings: DashMap::new(),
                noop: ProviderHandle::noop(),
                lifecycle: spawner.sibling(),
                events,
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// The bus aggregating every scope's events.
    #[must_use]
    pub fn root_bus(&self) -> &EventBus {
        &self.inner.root_bus
    }

    /// Returns the bus for `scope`, creating a named bus on first use.
    ///
    /// Named buses live as long as the registry.
    #[must_use]
    pub fn bus(&self, scope: &Scope) -> EventBus {
        match scope {
            Scope::Default => self.inner.default_bus.clone(),
            Scope::Named(name) => self
                .inner
                .named_buses
                .entry(name.clone())
                .or_insert_with(|| EventBus::new(self.inner.events.clone()))
                .clone(),
        }
    }

    /// Requests that `provider` become the default provider.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchyardError::RegistryShutDown`] after
    /// [`ProviderRegistry::shutdown_all`].
    pub fn set_default_provider(&self, provider: ProviderHandle) -> Result<()> {
        self.set_provider(Scope::Default, provider)
    }

    /// Requests that `provider` become the provider of client `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchyardError::InvalidArgument`] for a blank name and
    /// [`SwitchyardError::RegistryShutDown`] after shutdown.
    pub fn set_named_provider(&self, name: &str, provider: ProviderHandle) -> Result<()> {
        self.set_provider(Scope::named(name)?, provider)
    }

    /// Records `provider` as pending for `scope`, wires its event source,
    /// and spawns its initialization. Never waits for initialization.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchyardError::InvalidArgument`] for a blank scope name
    /// and [`SwitchyardError::RegistryShutDown`] after shutdown.
    pub fn set_provider(&self, scope: Scope, provider: ProviderHandle) -> Result<()> {
        if let Scope::Named(name) = &scope {
            Scope::named(name.as_str())?;
        }
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(SwitchyardError::RegistryShutDown);
        }
        // Checked again under the slot lock: `shutdown_all` flips the flag before
        // it resets any slot, so a slot written here is always reset.
        let prior_state = self.with_slot(&scope, |slot| {
            if self.inner.shut_down.load(Ordering::Acquire) {
                return None;
            }
            slot.pending = Some(provider.clone());
            Some(std::mem::replace(&mut slot.state, ScopeState::Initializing))
        });
        let Some(prior_state) = prior_state else {
            return Err(SwitchyardError::RegistryShutDown);
        };

        if let Some(source) = provider.event_source() {
            self.bus(&scope).forward(&source, scope.tag());
            self.inner.root_bus.forward(&source, scope.tag());
        }

        tracing::debug!(
            %scope,
            provider = %provider.metadata().name,
            provider_id = %provider.id(),
            "provider pending initialization"
        );

        let registry = self.clone();
        let task_scope = scope.clone();
        let task_provider = provider.clone();
        let accepted = self.inner.lifecycle.spawn("provider-init", async move {
            registry
                .initialize_and_promote(task_scope, task_provider)
                .await;
        });
        if accepted {
            return Ok(());
        }

        self.with_existing_slot(&scope, |slot| {
            if slot.pending.as_ref() == Some(&provider) {
                slot.pending = None;
                slot.state = prior_state;
            }
        });
        Err(SwitchyardError::RegistryShutDown)
    }

    /// Returns the active provider for `scope` without waiting on any
    /// in-flight initialization.
    ///
    /// A named scope without its own binding resolves to the default
    /// provider; an unbound default resolves to the no-op provider.
    #[must_use]
    pub fn get_provider(&self, scope: &Scope) -> ProviderHandle {
        match scope {
            Scope::Default => self.default_provider(),
            Scope::Named(name) => self
                .inner
                .named
                .get(name)
                .and_then(|slot| slot.active.clone())
                .unwrap_or_else(|| self.default_provider()),
        }
    }

    /// Metadata of the provider `get_provider(scope)` would return.
    #[must_use]
    pub fn provider_metadata(&self, scope: &Scope) -> ProviderMetadata {
        self.get_provider(scope).metadata()
    }

    /// Snapshot of `scope`'s binding.
    #[must_use]
    pub fn status(&self, scope: &Scope) -> ScopeStatus {
        let active = ProviderSummary::from(&self.get_provider(scope));
        let snapshot = |slot: &ProviderSlot| {
            (
                slot.state,
                slot.pending.as_ref().map(ProviderSummary::from),
                slot.promoted_at,
            )
        };
        let (state, pending, promoted_at) = match scope {
            Scope::Default => snapshot(&*self.inner.default_slot.read()),
            Scope::Named(name) => self
                .inner
                .named
                .get(name)
                .map(|slot| snapshot(&*slot))
                .unwrap_or_default(),
        };
        ScopeStatus {
            scope: scope.clone(),
            state,
            active,
            pending,
            promoted_at,
        }
    }

    /// Names of all scopes that currently have a slot, sorted.
    #[must_use]
    pub fn named_scopes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.named.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Shuts down every distinct active provider, unbinds all scopes, and
    /// stops accepting work.
    ///
    /// Afterwards every scope resolves to the no-op provider and setters
    /// fail with [`SwitchyardError::RegistryShutDown`]. Provider shutdowns
    /// run in the background; their failures are only logged.
    pub fn shutdown_all(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut seen = HashSet::new();
        let mut to_shut_down = Vec::new();
        let mut collect = |slot: &mut ProviderSlot| {
            if let Some(active) = slot.active.take()
                && seen.insert(active.id())
            {
                to_shut_down.push(active);
            }
            *slot = ProviderSlot::default();
        };

        collect(&mut *self.inner.default_slot.write());
        for mut entry in self.inner.named.iter_mut() {
            collect(entry.value_mut());
        }
        self.inner.named.clear();
        self.inner.bindings.clear();

        tracing::info!(providers = to_shut_down.len(), "shutting down provider registry");
        for provider in to_shut_down {
            self.schedule_shutdown(provider);
        }
        self.inner.lifecycle.close();
    }

    /// Returns `true` once [`ProviderRegistry::shutdown_all`] has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    fn default_provider(&self) -> ProviderHandle {
        self.inner
            .default_slot
            .read()
            .active
            .clone()
            .unwrap_or_else(|| self.inner.noop.clone())
    }

    fn with_slot<R>(&self, scope: &Scope, f: impl FnOnce(&mut ProviderSlot) -> R) -> R {
        match scope {
            Scope::Default => f(&mut *self.inner.default_slot.write()),
            Scope::Named(name) => f(&mut *self.inner.named.entry(name.clone()).or_default()),
        }
    }

    /// Like `with_slot`, but never creates a named slot.
    fn with_existing_slot<R>(
        &self,
        scope: &Scope,
        f: impl FnOnce(&mut ProviderSlot) -> R,
    ) -> Option<R> {
        match scope {
            Scope::Default => Some(f(&mut *self.inner.default_slot.write())),
            Scope::Named(name) => self.inner.named.get_mut(name).map(|mut slot| f(&mut *slot)),
        }
    }

    fn is_bound(&self, id: ProviderId) -> bool {
        self.inner.bindings.get(&id).is_some_and(|count| *count > 0)
    }

    async fn initialize_and_promote(&self, scope: Scope, provider: ProviderHandle) {
        let outcome = if self.is_bound(provider.id()) {
            tracing::debug!(%scope, provider_id = %provider.id(), "provider already bound; skipping initialize");
            Ok(())
        } else {
            run_initialize(&provider).await
        };

        match outcome {
            Ok(()) => self.promote(&scope, &provider),
            Err(err) => self.fail(&scope, &provider, &err),
        }
    }

    fn promote(&self, scope: &Scope, provider: &ProviderHandle) {
        let promotion = self
            .with_existing_slot(scope, |slot| {
                if slot.pending.as_ref() != Some(provider) {
                    return Promotion::Stale;
                }
                slot.pending = None;
                slot.state = ScopeState::Ready;
                slot.promoted_at = Some(Utc::now());
                let previous = slot.active.replace(provider.clone());
                if previous.as_ref() != Some(provider) {
                    *self.inner.bindings.entry(provider.id()).or_insert(0) += 1;
                }
                Promotion::Promoted { previous }
            })
            .unwrap_or(Promotion::Stale);

        let Promotion::Promoted { previous } = promotion else {
            tracing::warn!(
                %scope,
                provider_id = %provider.id(),
                "initialization superseded by a newer provider; result discarded"
            );
            return;
        };

        tracing::info!(
            %scope,
            provider = %provider.metadata().name,
            provider_id = %provider.id(),
            "provider promoted"
        );
        let details = EventDetails::new().tagged(scope.tag());
        self.bus(scope).emit(EventKind::Ready, details.clone());
        self.inner.root_bus.emit(EventKind::Ready, details);

        if let Some(previous) = previous
            && previous != *provider
        {
            self.release(previous);
        }
    }

    fn fail(&self, scope: &Scope, provider: &ProviderHandle, err: &ProviderError) {
        let current = self
            .with_existing_slot(scope, |slot| {
                if slot.pending.as_ref() != Some(provider) {
                    return false;
                }
                slot.pending = None;
                slot.state = ScopeState::Error;
                true
            })
            .unwrap_or(false);

        let error = SwitchyardError::ProviderInit {
            provider: provider.metadata().name,
            message: err.message.clone(),
        };
        tracing::error!(
            %scope,
            provider_id = %provider.id(),
            superseded = !current,
            error = %error,
            "provider initialization failed"
        );

        // Superseded failures still report; only the slot state is left alone.
        let details = EventDetails::new()
            .with_message(err.message.clone())
            .tagged(scope.tag());
        self.bus(scope).emit(EventKind::Error, details.clone());
        self.inner.root_bus.emit(EventKind::Error, details);
    }

    /// Drops one binding of `provider`, shutting it down on the last one.
    fn release(&self, provider: ProviderHandle) {
        let orphaned = match self.inner.bindings.entry(provider.id()) {
            Entry::Occupied(mut entry) => {
                let count = entry.get_mut();
                *count = count.saturating_sub(1);
                if *count == 0 {
                    entry.remove();
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        };
        if orphaned {
            self.schedule_shutdown(provider);
        }
    }

    fn schedule_shutdown(&self, provider: ProviderHandle) {
        self.inner.lifecycle.spawn("provider-shutdown", async move {
            let name = provider.metadata().name;
            let outcome = AssertUnwindSafe(provider.provider().shutdown())
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(ProviderError::new(panic_message(&*payload))));
            match outcome {
                Ok(()) => {
                    tracing::debug!(provider = %name, provider_id = %provider.id(), "provider shut down");
                }
                Err(err) => {
                    let error = SwitchyardError::ProviderShutdown {
                        provider: name,
                        message: err.message,
                    };
                    tracing::error!(provider_id = %provider.id(), error = %error, "provider shutdown failed");
                }
            }
        });
    }
}

async fn run_initialize(provider: &ProviderHandle) -> std::result::Result<(), ProviderError> {
    AssertUnwindSafe(provider.provider().initialize())
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(ProviderError::new(panic_message(&*payload))))
}
