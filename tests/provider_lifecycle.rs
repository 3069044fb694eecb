//! End-to-end provider lifecycle scenarios through the public API.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use switchyard::domain::{
    EventBus, EventDetails, EventKind, FeatureProvider, NoOpProvider, ProviderError,
    ProviderHandle, ProviderMetadata, Scope, ScopeState,
};
use switchyard::{ApiConfig, EventHandling, FeatureApi};

const WAIT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(150);

#[derive(Debug, Default)]
struct Counters {
    inits: AtomicUsize,
    shutdowns: AtomicUsize,
}

#[derive(Debug)]
struct ScriptedProvider {
    name: &'static str,
    bus: Option<EventBus>,
    gate: Option<Arc<Notify>>,
    fail_with: Option<&'static str>,
    counters: Arc<Counters>,
}

impl ScriptedProvider {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            bus: None,
            gate: None,
            fail_with: None,
            counters: Arc::new(Counters::default()),
        }
    }

    fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl FeatureProvider for ScriptedProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new(self.name)
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(message) => Err(ProviderError::new(message)),
            None => Ok(()),
        }
    }

    async fn shutdown(&self) -> Result<(), ProviderError> {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn event_source(&self) -> Option<EventBus> {
        self.bus.clone()
    }
}

fn make_api() -> FeatureApi {
    let Ok(api) = FeatureApi::new(ApiConfig::default()) else {
        panic!("tests run inside a runtime");
    };
    api
}

fn collect(bus: &EventBus, kind: EventKind) -> mpsc::UnboundedReceiver<EventDetails> {
    let (tx, rx) = mpsc::unbounded_channel();
    bus.register_handler(kind, move |details| {
        let _ = tx.send(details);
    });
    rx
}

async fn next(rx: &mut mpsc::UnboundedReceiver<EventDetails>) -> EventDetails {
    let Ok(Some(details)) = tokio::time::timeout(WAIT, rx.recv()).await else {
        panic!("expected an event");
    };
    details
}

async fn settle_count(counter: &AtomicUsize, expected: usize) {
    for _ in 0..100 {
        if counter.load(Ordering::SeqCst) >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(SETTLE).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn promotion_emits_one_ready_on_scope_and_root() {
    let api = make_api();
    let Ok(client) = api.client("svc") else {
        panic!("valid name");
    };
    let mut scope_ready = collect(&api.registry().bus(client.scope()), EventKind::Ready);
    let mut root_ready = collect(api.event_bus(), EventKind::Ready);

    let handle = ProviderHandle::new(ScriptedProvider::new("p"));
    assert!(api.set_named_provider("svc", handle.clone()).is_ok());

    assert_eq!(next(&mut scope_ready).await.scope_name.as_deref(), Some("svc"));
    assert_eq!(next(&mut root_ready).await.scope_name.as_deref(), Some("svc"));
    assert_eq!(client.provider(), handle);
    assert_eq!(client.provider_metadata().name, "p");

    tokio::time::sleep(SETTLE).await;
    assert!(scope_ready.try_recv().is_err());
    assert!(root_ready.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn default_scope_events_are_untagged() {
    let api = make_api();
    let mut ready = collect(api.event_bus(), EventKind::Ready);
    assert!(api.set_provider(ProviderHandle::new(ScriptedProvider::new("d"))).is_ok());
    assert_eq!(next(&mut ready).await.scope_name, None);
    assert_eq!(api.provider_metadata(&Scope::Default).name, "d");
}

#[tokio::test(flavor = "multi_thread")]
async fn superseded_initialization_never_promotes() {
    for slow_fails in [false, true] {
        let api = make_api();
        let mut ready = collect(api.event_bus(), EventKind::Ready);
        let mut errors = collect(api.event_bus(), EventKind::Error);

        let gate = Arc::new(Notify::new());
        let mut slow = ScriptedProvider::new("slow");
        slow.gate = Some(Arc::clone(&gate));
        if slow_fails {
            slow.fail_with = Some("late failure");
        }
        let slow_counters = slow.counters();
        let fast = ProviderHandle::new(ScriptedProvider::new("fast"));

        assert!(api.set_named_provider("svc", ProviderHandle::new(slow)).is_ok());
        assert!(api.set_named_provider("svc", fast.clone()).is_ok());
        assert_eq!(next(&mut ready).await.scope_name.as_deref(), Some("svc"));

        gate.notify_one();
        settle_count(&slow_counters.inits, 1).await;

        let Ok(client) = api.client("svc") else {
            panic!("valid name");
        };
        assert_eq!(client.provider(), fast);
        assert!(ready.try_recv().is_err());
        if slow_fails {
            let got = next(&mut errors).await;
            assert_eq!(got.message.as_deref(), Some("late failure"));
            assert_eq!(got.scope_name.as_deref(), Some("svc"));
        }
        assert!(errors.try_recv().is_err());
        assert_eq!(client.status().state, ScopeState::Ready);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn default_scope_converges_in_either_completion_order() {
    for newer_finishes_first in [false, true] {
        let api = make_api();
        let mut scope_ready = collect(&api.registry().bus(&Scope::Default), EventKind::Ready);
        let mut root_ready = collect(api.event_bus(), EventKind::Ready);

        let older_gate = Arc::new(Notify::new());
        let newer_gate = Arc::new(Notify::new());
        let mut older = ScriptedProvider::new("older");
        older.gate = Some(Arc::clone(&older_gate));
        let older_counters = older.counters();
        let mut newer = ScriptedProvider::new("newer");
        newer.gate = Some(Arc::clone(&newer_gate));
        let newer_counters = newer.counters();
        let newer = ProviderHandle::new(newer);

        assert!(api.set_provider(ProviderHandle::new(older)).is_ok());
        assert!(api.set_provider(newer.clone()).is_ok());

        if newer_finishes_first {
            newer_gate.notify_one();
            settle_count(&newer_counters.inits, 1).await;
            older_gate.notify_one();
            settle_count(&older_counters.inits, 1).await;
        } else {
            older_gate.notify_one();
            settle_count(&older_counters.inits, 1).await;
            newer_gate.notify_one();
            settle_count(&newer_counters.inits, 1).await;
        }

        assert_eq!(api.provider(), newer);
        assert_eq!(next(&mut scope_ready).await.scope_name, None);
        assert_eq!(next(&mut root_ready).await.scope_name, None);
        assert!(scope_ready.try_recv().is_err());
        assert!(root_ready.try_recv().is_err());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_outlives_default_while_a_client_holds_it() {
    let api = make_api();
    let mut ready = collect(api.event_bus(), EventKind::Ready);

    let shared = ScriptedProvider::new("shared");
    let counters = shared.counters();
    let shared = ProviderHandle::new(shared);
    assert!(api.set_provider(shared.clone()).is_ok());
    next(&mut ready).await;
    assert!(api.set_named_provider("svc", shared.clone()).is_ok());
    next(&mut ready).await;

    assert!(api.set_provider(ProviderHandle::new(ScriptedProvider::new("next"))).is_ok());
    next(&mut ready).await;
    tokio::time::sleep(SETTLE).await;
    assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 0);
    let Ok(client) = api.client("svc") else {
        panic!("valid name");
    };
    assert_eq!(client.provider(), shared);

    assert!(api.set_named_provider("svc", ProviderHandle::noop()).is_ok());
    next(&mut ready).await;
    settle_count(&counters.shutdowns, 1).await;
    assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_initialization_emits_one_tagged_error() {
    let api = make_api();
    let mut ready = collect(api.event_bus(), EventKind::Ready);
    let Ok(client) = api.client("svc") else {
        panic!("valid name");
    };
    let (tx, mut errors) = mpsc::unbounded_channel();
    client.on_error(move |details| {
        let _ = tx.send(details);
    });

    let good = ProviderHandle::new(ScriptedProvider::new("good"));
    assert!(api.set_named_provider("svc", good.clone()).is_ok());
    next(&mut ready).await;

    let mut bad = ScriptedProvider::new("bad");
    bad.fail_with = Some("oh no!");
    assert!(api.set_named_provider("svc", ProviderHandle::new(bad)).is_ok());

    let got = next(&mut errors).await;
    assert_eq!(got.message.as_deref(), Some("oh no!"));
    assert_eq!(got.scope_name.as_deref(), Some("svc"));
    assert_eq!(client.provider(), good);

    tokio::time::sleep(SETTLE).await;
    assert!(errors.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_shared_by_two_scopes_is_shut_down_once() {
    let api = make_api();
    let mut ready = collect(api.event_bus(), EventKind::Ready);

    let shared = ScriptedProvider::new("shared");
    let counters = shared.counters();
    let shared = ProviderHandle::new(shared);
    assert!(api.set_named_provider("a", shared.clone()).is_ok());
    next(&mut ready).await;
    assert!(api.set_named_provider("b", shared).is_ok());
    next(&mut ready).await;

    assert!(api.set_named_provider("a", ProviderHandle::noop()).is_ok());
    next(&mut ready).await;
    tokio::time::sleep(SETTLE).await;
    assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 0);

    assert!(api.set_named_provider("b", ProviderHandle::noop()).is_ok());
    next(&mut ready).await;
    settle_count(&counters.shutdowns, 1).await;
    assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn forwarded_events_carry_the_scope_tag() {
    let api = make_api();
    let mut ready = collect(api.event_bus(), EventKind::Ready);
    let mut root_stale = collect(api.event_bus(), EventKind::Stale);

    let Ok(source) = EventBus::try_current() else {
        panic!("inside runtime");
    };
    let mut provider = ScriptedProvider::new("emitter");
    provider.bus = Some(source.clone());
    assert!(api.set_named_provider("svc", ProviderHandle::new(provider)).is_ok());
    next(&mut ready).await;

    source.emit(
        EventKind::Stale,
        EventDetails::new()
            .with_message("cache expired")
            .tagged(Some("spoofed".to_string())),
    );
    let got = next(&mut root_stale).await;
    assert_eq!(got.scope_name.as_deref(), Some("svc"));
    assert_eq!(got.message.as_deref(), Some("cache expired"));
}

#[tokio::test(flavor = "multi_thread")]
async fn configuration_change_reaches_scope_handler() {
    let api = make_api();
    let Ok(client) = api.client("svc") else {
        panic!("valid name");
    };
    let (tx, mut changed) = mpsc::unbounded_channel();
    client.on_configuration_changed(move |details| {
        let _ = tx.send(details);
    });
    let mut ready = collect(api.event_bus(), EventKind::Ready);

    let Ok(source) = EventBus::try_current() else {
        panic!("inside runtime");
    };
    let mut provider = ScriptedProvider::new("p");
    provider.bus = Some(source.clone());
    assert!(api.set_named_provider("svc", ProviderHandle::new(provider)).is_ok());
    next(&mut ready).await;

    source.emit(
        EventKind::ConfigurationChanged,
        EventDetails::new().with_flags_changed(["x"]),
    );
    let got = next(&mut changed).await;
    assert_eq!(got.scope_name.as_deref(), Some("svc"));
    assert_eq!(got.flags_changed, Some(vec!["x".to_string()]));
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_leaves_only_noop_bindings() {
    let api = make_api();
    let mut ready = collect(api.event_bus(), EventKind::Ready);

    let default = ScriptedProvider::new("default");
    let default_counters = default.counters();
    let named = ScriptedProvider::new("named");
    let named_counters = named.counters();
    assert!(api.set_provider(ProviderHandle::new(default)).is_ok());
    next(&mut ready).await;
    assert!(api.set_named_provider("x", ProviderHandle::new(named)).is_ok());
    next(&mut ready).await;

    api.shutdown();
    settle_count(&default_counters.shutdowns, 1).await;
    settle_count(&named_counters.shutdowns, 1).await;
    assert_eq!(default_counters.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(named_counters.shutdowns.load(Ordering::SeqCst), 1);

    assert!(api.registry().named_scopes().is_empty());
    let x = Scope::Named("x".into());
    assert_eq!(api.provider_metadata(&x).name, NoOpProvider::NAME);
    assert_eq!(api.get_provider(&x), api.provider());
    assert!(api.set_named_provider("x", ProviderHandle::noop()).is_err());
}
