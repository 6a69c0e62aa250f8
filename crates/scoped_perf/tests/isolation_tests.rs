//! Integration tests for scope isolation over one shared registry
//!
//! These tests run several adapters against the same registry, the way
//! independent request handlers share the process-wide registry, and check
//! that each one sees and removes only its own entries and listeners.

use proptest::prelude::*;
use scoped_perf::{
    EntryKind, Event, EventListener, ListenerOptions, MarkOptions, MeasureStart, ScopeOptions,
    ScopedPerformance, SharedRegistry, TimingRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use timing_registry::PerformanceRegistry;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Registry harness keeping both the concrete and the shared handle
struct Harness {
    raw: Arc<PerformanceRegistry>,
    shared: SharedRegistry,
}

impl Harness {
    fn new() -> Self {
        init_tracing();
        let raw = Arc::new(PerformanceRegistry::new());
        let shared: SharedRegistry = raw.clone();
        Self { raw, shared }
    }

    fn scope(&self, id: &str) -> ScopedPerformance {
        ScopedPerformance::with_scope_id(self.shared.clone(), id)
    }

    fn raw_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.get_entries().into_iter().map(|e| e.name).collect();
        names.sort();
        names
    }
}

fn counting_listener() -> (Arc<AtomicUsize>, EventListener) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let listener = EventListener::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (count, listener)
}

#[test]
fn test_server_and_client_marks_do_not_collide() {
    let harness = Harness::new();
    let server = harness.scope("server");
    let client = harness.scope("client");

    server.mark("start", MarkOptions::new()).unwrap();
    client.mark("start", MarkOptions::new()).unwrap();

    assert_eq!(harness.raw_names(), vec!["client::start", "server::start"]);

    let from_server = server.get_entries();
    assert_eq!(from_server.len(), 1);
    assert_eq!(from_server[0].name, "start");

    let from_client = client.get_entries();
    assert_eq!(from_client.len(), 1);
    assert_eq!(from_client[0].name, "start");
}

#[test]
fn test_measure_between_marks_is_exact() {
    let harness = Harness::new();
    let a = harness.scope("a");

    a.mark("m1", MarkOptions::new().with_start_time(1.0)).unwrap();
    a.mark("m2", MarkOptions::new().with_start_time(5.0)).unwrap();
    a.measure("dur", Some(MeasureStart::mark("m1")), Some("m2")).unwrap();

    let measures = a.get_entries_by_type(EntryKind::Measure);
    assert_eq!(measures.len(), 1);
    assert_eq!(measures[0].name, "dur");
    assert_eq!(measures[0].duration, 4.0);
    assert!(measures[0].is_measure());
}

#[test]
fn test_marks_in_other_scope_are_not_referenced() {
    let harness = Harness::new();
    let a = harness.scope("a");
    let b = harness.scope("b");

    a.mark("shared-name", MarkOptions::new()).unwrap();
    assert!(b
        .measure("m", Some(MeasureStart::mark("shared-name")), None)
        .is_err());
}

#[test]
fn test_teardown_restores_registry() {
    let harness = Harness::new();
    harness.shared.mark("direct", MarkOptions::new()).unwrap();
    let before = harness.raw_names();

    let other = harness.scope("other");
    other.mark("keep", MarkOptions::new()).unwrap();

    {
        let scoped = harness.scope("request");
        scoped.mark("a", MarkOptions::new()).unwrap();
        scoped.mark("b", MarkOptions::new()).unwrap();
        scoped.measure("a-b", Some(MeasureStart::mark("a")), Some("b")).unwrap();
        scoped.measure("total", None, None).unwrap();
        assert_eq!(harness.raw_names().len(), before.len() + 5);
    }

    let mut expected = before;
    expected.push("other::keep".to_string());
    expected.sort();
    assert_eq!(harness.raw_names(), expected);
}

#[test]
fn test_teardown_unsubscribes_only_own_listeners() {
    let harness = Harness::new();
    let (scoped_count, scoped_listener) = counting_listener();
    let (direct_count, direct_listener) = counting_listener();

    let a = harness.scope("a");
    a.add_event_listener("x", &scoped_listener, ListenerOptions::new());
    harness
        .shared
        .add_event_listener("x", &direct_listener, ListenerOptions::new());

    harness.shared.dispatch_event(&Event::new("x"));
    assert_eq!(scoped_count.load(Ordering::SeqCst), 1);
    assert_eq!(direct_count.load(Ordering::SeqCst), 1);

    drop(a);
    harness.shared.dispatch_event(&Event::new("x"));

    assert_eq!(scoped_count.load(Ordering::SeqCst), 1);
    assert_eq!(direct_count.load(Ordering::SeqCst), 2);
    assert_eq!(harness.raw.listener_count("x"), 1);
}

#[test]
fn test_removed_listener_is_not_removed_twice() {
    let harness = Harness::new();
    let (_, listener) = counting_listener();
    let a = harness.scope("a");

    a.add_event_listener("x", &listener, ListenerOptions::new());
    a.remove_event_listener("x", &listener, ListenerOptions::new());
    assert_eq!(a.listener_count(), 0);

    // The same callback added directly must survive the adapter's teardown.
    harness
        .shared
        .add_event_listener("x", &listener, ListenerOptions::new());
    a.close();
    assert_eq!(harness.raw.listener_count("x"), 1);
}

#[test]
fn test_fired_once_listener_leaves_direct_registration_alone() {
    let harness = Harness::new();
    let (count, listener) = counting_listener();
    let a = harness.scope("a");

    a.add_event_listener("x", &listener, ListenerOptions::new().with_once(true));
    harness.shared.dispatch_event(&Event::new("x"));
    assert_eq!(a.listener_count(), 0);
    assert_eq!(harness.raw.listener_count("x"), 0);

    harness
        .shared
        .add_event_listener("x", &listener, ListenerOptions::new());
    a.close();

    assert_eq!(harness.raw.listener_count("x"), 1);
    harness.shared.dispatch_event(&Event::new("x"));
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_default_options_use_global_registry() {
    let perf = ScopedPerformance::new();
    perf.mark("global-mark", MarkOptions::new()).unwrap();

    let global = scoped_perf::global_registry();
    let scoped = perf.scope_id().scope("global-mark");
    assert_eq!(global.get_entries_by_name(&scoped, None).len(), 1);

    drop(perf);
    assert!(global.get_entries_by_name(&scoped, None).is_empty());
}

#[tokio::test]
async fn test_interleaved_handlers_stay_isolated() {
    let harness = Harness::new();
    let mut handles = Vec::new();

    for request in 0..8 {
        let registry = harness.shared.clone();
        handles.push(tokio::spawn(async move {
            let perf = ScopedPerformance::with_options(ScopeOptions::new().with_registry(registry));
            perf.mark("start", MarkOptions::new()).unwrap();
            tokio::task::yield_now().await;
            perf.mark("end", MarkOptions::new()).unwrap();
            perf.measure("handle", Some(MeasureStart::mark("start")), Some("end"))
                .unwrap();
            tokio::task::yield_now().await;

            let names: Vec<String> = perf.get_entries().into_iter().map(|e| e.name).collect();
            (request, names)
        }));
    }

    for handle in handles {
        let (_, names) = handle.await.unwrap();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"start".to_string()));
        assert!(names.contains(&"end".to_string()));
        assert!(names.contains(&"handle".to_string()));
    }

    assert!(harness.shared.get_entries().is_empty());
}

proptest! {
    #[test]
    fn prop_marks_never_cross_scopes(
        names_a in prop::collection::vec("[a-z]{1,6}", 1..8),
        names_b in prop::collection::vec("[a-z]{1,6}", 1..8),
    ) {
        let harness = Harness::new();
        let a = harness.scope("scope-a");
        let b = harness.scope("scope-b");

        for name in &names_a {
            a.mark(name, MarkOptions::new()).unwrap();
        }
        for name in &names_b {
            b.mark(name, MarkOptions::new()).unwrap();
        }

        prop_assert_eq!(a.get_entries().len(), names_a.len());
        prop_assert_eq!(b.get_entries().len(), names_b.len());
        prop_assert!(harness
            .shared
            .get_entries()
            .iter()
            .all(|e| e.name.starts_with("scope-a::") || e.name.starts_with("scope-b::")));

        a.clear_marks(None);
        prop_assert!(a.get_entries().is_empty());
        prop_assert_eq!(b.get_entries().len(), names_b.len());
    }
}
