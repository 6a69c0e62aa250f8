//! The scoped namespace adapter

use crate::listeners::{ListenerRegistration, ListenerRegistry};
use crate::scope::{default_id_generator, IdGenerator, ScopeId};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use timing_registry::{
    global_registry, EntryKind, Event, EventListener, ListenerOptions, MarkOptions, MeasureStart,
    PerformanceEntry, RegistryResult, SharedRegistry, TimingRegistry,
};

/// Construction options for [`ScopedPerformance`].
#[derive(Clone, Default)]
pub struct ScopeOptions {
    /// Registry to wrap; defaults to the process-wide registry
    pub registry: Option<SharedRegistry>,
    /// Scope identifier source; defaults to random UUIDs
    pub id_generator: Option<IdGenerator>,
}

impl ScopeOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a specific registry.
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a custom identifier generator.
    pub fn with_id_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.id_generator = Some(Arc::new(generator));
        self
    }
}

impl fmt::Debug for ScopeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeOptions")
            .field("registry", &self.registry.is_some())
            .field("id_generator", &self.id_generator.is_some())
            .finish()
    }
}

/// A view of a shared timing registry restricted to one scope.
///
/// Names passed in are rewritten to `<scope>::<name>`; entries read back are
/// filtered to this scope and renamed to their logical names. Listener
/// subscriptions are forwarded and remembered so they can be cancelled on
/// teardown. A `once` subscription is forwarded as an adapter-owned wrapper
/// that drops the adapter's record when it fires.
///
/// Teardown runs on [`close`](Self::close) or drop. Calls made after an
/// explicit `close` are still forwarded and are cleaned up by the next
/// teardown.
pub struct ScopedPerformance {
    registry: SharedRegistry,
    scope: ScopeId,
    listeners: Arc<Mutex<ListenerRegistry>>,
}

impl ScopedPerformance {
    /// Create an adapter over the process-wide registry with a random scope.
    pub fn new() -> Self {
        Self::with_options(ScopeOptions::default())
    }

    /// Create an adapter from explicit options.
    pub fn with_options(options: ScopeOptions) -> Self {
        let registry = options.registry.unwrap_or_else(global_registry);
        let generator = options.id_generator.unwrap_or_else(default_id_generator);
        Self::from_parts(registry, ScopeId::generate(&generator))
    }

    /// Create an adapter with a fixed scope identifier.
    pub fn with_scope_id(registry: SharedRegistry, id: impl Into<String>) -> Self {
        Self::from_parts(registry, ScopeId::new(id))
    }

    fn from_parts(registry: SharedRegistry, scope: ScopeId) -> Self {
        tracing::debug!(target: "perf::scope", scope = %scope, "scope created");
        Self {
            registry,
            scope,
            listeners: Arc::new(Mutex::new(ListenerRegistry::new())),
        }
    }

    /// This adapter's scope identifier.
    pub fn scope_id(&self) -> &ScopeId {
        &self.scope
    }

    /// The wrapped registry.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Number of listeners currently recorded for teardown.
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Remove every mark, measure and listener created through this adapter.
    ///
    /// Leaves other scopes and direct registry users untouched. Safe to call
    /// more than once; it also runs on drop.
    pub fn close(&self) {
        let marks = self.clear_scoped(EntryKind::Mark);
        let measures = self.clear_scoped(EntryKind::Measure);

        let registrations = self.listeners().drain();
        for registration in &registrations {
            self.registry.remove_event_listener(
                &registration.event_type,
                &registration.forwarded,
                ListenerOptions::from(registration.capture),
            );
        }

        tracing::debug!(
            target: "perf::scope",
            scope = %self.scope,
            marks = marks,
            measures = measures,
            listeners = registrations.len(),
            "scope closed"
        );
    }

    fn listeners(&self) -> MutexGuard<'_, ListenerRegistry> {
        lock(&self.listeners)
    }

    /// Wrap a `once` callback so firing it also drops this adapter's record.
    fn once_wrapper(&self, event_type: &str, listener: &EventListener, capture: bool) -> EventListener {
        let bookkeeping = Arc::downgrade(&self.listeners);
        let event_type = event_type.to_string();
        let callback = listener.clone();
        EventListener::new(move |event| {
            if let Some(bookkeeping) = bookkeeping.upgrade() {
                lock(&bookkeeping).forget(&event_type, &callback, capture);
            }
            callback.call(event);
        })
    }

    /// Delete this scope's entries of one kind, one name at a time.
    fn clear_scoped(&self, kind: EntryKind) -> usize {
        let mut names: Vec<String> = self
            .registry
            .get_entries_by_type(kind)
            .into_iter()
            .filter(|entry| self.scope.owns(&entry.name))
            .map(|entry| entry.name)
            .collect();
        names.sort();
        names.dedup();

        for name in &names {
            match kind {
                EntryKind::Mark => self.registry.clear_marks(Some(name)),
                EntryKind::Measure => self.registry.clear_measures(Some(name)),
            }
        }
        names.len()
    }

    fn project(&self, entries: Vec<PerformanceEntry>) -> Vec<PerformanceEntry> {
        entries
            .iter()
            .filter_map(|entry| self.scope.unscope(&entry.name).map(|name| entry.with_name(name)))
            .collect()
    }
}

fn lock(listeners: &Mutex<ListenerRegistry>) -> MutexGuard<'_, ListenerRegistry> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for ScopedPerformance {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopedPerformance {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ScopedPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedPerformance")
            .field("scope", &self.scope)
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl TimingRegistry for ScopedPerformance {
    /// Returns the registry's entry as-is, so its name is the scoped one.
    fn mark(&self, name: &str, options: MarkOptions) -> RegistryResult<PerformanceEntry> {
        self.registry.mark(&self.scope.scope(name), options)
    }

    /// Mark-name references are scoped; an options start is forwarded as-is.
    fn measure(
        &self,
        name: &str,
        start: Option<MeasureStart>,
        end: Option<&str>,
    ) -> RegistryResult<PerformanceEntry> {
        let start = start.map(|start| match start {
            MeasureStart::Mark(mark) => MeasureStart::Mark(self.scope.scope(&mark)),
            options @ MeasureStart::Options(_) => options,
        });
        let end = end.map(|mark| self.scope.scope(mark));
        self.registry
            .measure(&self.scope.scope(name), start, end.as_deref())
    }

    fn now(&self) -> f64 {
        self.registry.now()
    }

    fn time_origin(&self) -> f64 {
        self.registry.time_origin()
    }

    fn get_entries(&self) -> Vec<PerformanceEntry> {
        self.project(self.registry.get_entries())
    }

    fn get_entries_by_type(&self, kind: EntryKind) -> Vec<PerformanceEntry> {
        self.project(self.registry.get_entries_by_type(kind))
    }

    fn get_entries_by_name(&self, name: &str, kind: Option<EntryKind>) -> Vec<PerformanceEntry> {
        self.project(self.registry.get_entries_by_name(&self.scope.scope(name), kind))
    }

    fn clear_marks(&self, name: Option<&str>) {
        match name {
            Some(name) => self.registry.clear_marks(Some(&self.scope.scope(name))),
            None => {
                self.clear_scoped(EntryKind::Mark);
            }
        }
    }

    fn clear_measures(&self, name: Option<&str>) {
        match name {
            Some(name) => self.registry.clear_measures(Some(&self.scope.scope(name))),
            None => {
                self.clear_scoped(EntryKind::Measure);
            }
        }
    }

    fn to_json(&self) -> RegistryResult<Value> {
        self.registry.to_json()
    }

    fn add_event_listener(&self, event_type: &str, listener: &EventListener, options: ListenerOptions) {
        let capture = options.normalized().capture;
        // Already subscribed through this adapter; the registry would de-duplicate it.
        if self.listeners().find(event_type, listener, capture).is_some() {
            return;
        }

        let forwarded = if options.once {
            self.once_wrapper(event_type, listener, capture)
        } else {
            listener.clone()
        };
        self.registry.add_event_listener(event_type, &forwarded, options);
        self.listeners().record(
            ListenerRegistration::new(event_type, listener.clone(), capture).with_forwarded(forwarded),
        );
    }

    fn remove_event_listener(&self, event_type: &str, listener: &EventListener, options: ListenerOptions) {
        let recorded = self
            .listeners()
            .forget(event_type, listener, options.normalized().capture);
        let forwarded = recorded.map_or_else(|| listener.clone(), |r| r.forwarded);
        self.registry.remove_event_listener(event_type, &forwarded, options);
    }

    fn dispatch_event(&self, event: &Event) -> bool {
        self.registry.dispatch_event(event)
    }
}
