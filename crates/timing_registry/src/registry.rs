//! The timing registry contract and its in-memory implementation

use crate::entry::{EntryKind, MarkOptions, MeasureOptions, MeasureStart, PerformanceEntry, TimeRef};
use crate::error::{RegistryError, RegistryResult};
use crate::event::{Event, EventListener, ListenerOptions};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

/// Shared handle to a timing registry.
pub type SharedRegistry = Arc<dyn TimingRegistry>;

/// Global registry instance
static GLOBAL_REGISTRY: OnceLock<Arc<PerformanceRegistry>> = OnceLock::new();

/// Get the process-wide registry.
///
/// Created on first use; every call returns a handle to the same instance.
pub fn global_registry() -> SharedRegistry {
    GLOBAL_REGISTRY
        .get_or_init(|| Arc::new(PerformanceRegistry::new()))
        .clone()
}

/// Operations of a shared timing registry.
///
/// Every operation is applied atomically with respect to other callers of the
/// same registry.
pub trait TimingRegistry: Send + Sync {
    /// Record a mark and return the created entry.
    fn mark(&self, name: &str, options: MarkOptions) -> RegistryResult<PerformanceEntry>;

    /// Record a measure between a start reference and an end mark.
    ///
    /// Without an end mark the measure ends now; without a start reference it
    /// starts at the time origin.
    fn measure(
        &self,
        name: &str,
        start: Option<MeasureStart>,
        end: Option<&str>,
    ) -> RegistryResult<PerformanceEntry>;

    /// Milliseconds elapsed since the time origin.
    fn now(&self) -> f64;

    /// The time origin as milliseconds since the Unix epoch.
    fn time_origin(&self) -> f64;

    /// All entries in start-time order.
    fn get_entries(&self) -> Vec<PerformanceEntry>;

    /// All entries of one kind in start-time order.
    fn get_entries_by_type(&self, kind: EntryKind) -> Vec<PerformanceEntry>;

    /// Entries with exactly this name, optionally restricted to one kind.
    fn get_entries_by_name(&self, name: &str, kind: Option<EntryKind>) -> Vec<PerformanceEntry>;

    /// Remove marks with this name, or every mark when `name` is `None`.
    fn clear_marks(&self, name: Option<&str>);

    /// Remove measures with this name, or every measure when `name` is `None`.
    fn clear_measures(&self, name: Option<&str>);

    /// Serialize the registry's top-level state.
    fn to_json(&self) -> RegistryResult<Value>;

    /// Subscribe to an event type.
    fn add_event_listener(&self, event_type: &str, listener: &EventListener, options: ListenerOptions);

    /// Unsubscribe a previously added listener.
    fn remove_event_listener(&self, event_type: &str, listener: &EventListener, options: ListenerOptions);

    /// Deliver an event; returns `false` if a listener cancelled it.
    fn dispatch_event(&self, event: &Event) -> bool;
}

#[derive(Debug, Clone)]
struct ListenerSlot {
    event_type: String,
    listener: EventListener,
    capture: bool,
    once: bool,
}

impl ListenerSlot {
    fn matches(&self, event_type: &str, listener: &EventListener, capture: bool) -> bool {
        self.event_type == event_type && self.listener == *listener && self.capture == capture
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrySnapshot {
    time_origin: f64,
}

/// In-memory timing registry.
#[derive(Debug)]
pub struct PerformanceRegistry {
    /// Monotonic reference for `now()`
    origin: Instant,
    /// Wall-clock time of `origin`, in epoch milliseconds
    time_origin: f64,
    /// Marks and measures in insertion order
    entries: Mutex<Vec<PerformanceEntry>>,
    /// Subscribed listeners in registration order
    listeners: Mutex<Vec<ListenerSlot>>,
}

impl PerformanceRegistry {
    /// Create an empty registry whose time origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            time_origin: chrono::Utc::now().timestamp_micros() as f64 / 1000.0,
            entries: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Number of listeners subscribed to an event type.
    pub fn listener_count(&self, event_type: &str) -> usize {
        lock(&self.listeners)
            .iter()
            .filter(|slot| slot.event_type == event_type)
            .count()
    }

    fn sorted(mut entries: Vec<PerformanceEntry>) -> Vec<PerformanceEntry> {
        entries.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        entries
    }

    fn clear_kind(&self, kind: EntryKind, name: Option<&str>) {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|e| e.kind != kind || name.is_some_and(|n| e.name != n));

        tracing::debug!(
            target: "perf::registry",
            kind = %kind,
            name = name,
            removed = before - entries.len(),
            "entries cleared"
        );
    }
}

impl Default for PerformanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn valid_timestamp(field: &'static str, value: f64) -> RegistryResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(RegistryError::InvalidTimestamp { field, value });
    }
    Ok(value)
}

fn mark_time(entries: &[PerformanceEntry], name: &str) -> RegistryResult<f64> {
    entries
        .iter()
        .rev()
        .find(|e| e.is_mark() && e.name == name)
        .map(|e| e.start_time)
        .ok_or_else(|| RegistryError::UnknownMark(name.to_string()))
}

fn resolve(entries: &[PerformanceEntry], field: &'static str, time: &TimeRef) -> RegistryResult<f64> {
    match time {
        TimeRef::Mark(name) => mark_time(entries, name),
        TimeRef::Timestamp(ms) => valid_timestamp(field, *ms),
    }
}

fn validate_options(options: &MeasureOptions, end: Option<&str>) -> RegistryResult<()> {
    if end.is_some() {
        return Err(RegistryError::InvalidMeasureOptions(
            "an end mark cannot be combined with measure options",
        ));
    }
    if options.start.is_none() && options.end.is_none() {
        return Err(RegistryError::InvalidMeasureOptions(
            "a start or end must be supplied in measure options",
        ));
    }
    if options.start.is_some() && options.end.is_some() && options.duration.is_some() {
        return Err(RegistryError::InvalidMeasureOptions(
            "start, end and duration cannot all be supplied",
        ));
    }
    Ok(())
}

impl TimingRegistry for PerformanceRegistry {
    fn mark(&self, name: &str, options: MarkOptions) -> RegistryResult<PerformanceEntry> {
        let start_time = match options.start_time {
            Some(ms) => valid_timestamp("startTime", ms)?,
            None => self.now(),
        };
        let entry = PerformanceEntry::mark(name, start_time, options.detail);
        lock(&self.entries).push(entry.clone());

        tracing::trace!(
            target: "perf::registry",
            name = name,
            start_time = start_time,
            "mark recorded"
        );
        Ok(entry)
    }

    fn measure(
        &self,
        name: &str,
        start: Option<MeasureStart>,
        end: Option<&str>,
    ) -> RegistryResult<PerformanceEntry> {
        let (options, start_mark) = match start {
            Some(MeasureStart::Options(options)) if !options.is_empty() => (Some(options), None),
            Some(MeasureStart::Options(_)) | None => (None, None),
            Some(MeasureStart::Mark(mark)) => (None, Some(mark)),
        };
        if let Some(options) = &options {
            validate_options(options, end)?;
        }

        let mut entries = lock(&self.entries);

        let end_time = match &options {
            Some(MeasureOptions { end: Some(end), .. }) => resolve(&entries, "end", end)?,
            Some(MeasureOptions {
                start: Some(start),
                duration: Some(duration),
                ..
            }) => resolve(&entries, "start", start)? + duration,
            _ => match end {
                Some(mark) => mark_time(&entries, mark)?,
                None => self.now(),
            },
        };

        let start_time = match &options {
            Some(MeasureOptions { start: Some(start), .. }) => resolve(&entries, "start", start)?,
            Some(MeasureOptions {
                duration: Some(duration),
                end: Some(_),
                ..
            }) => end_time - duration,
            _ => match &start_mark {
                Some(mark) => mark_time(&entries, mark)?,
                None => 0.0,
            },
        };

        let detail = options.and_then(|o| o.detail);
        let entry = PerformanceEntry::measure(name, start_time, end_time - start_time, detail);
        entries.push(entry.clone());

        tracing::trace!(
            target: "perf::registry",
            name = name,
            start_time = start_time,
            duration = entry.duration,
            "measure recorded"
        );
        Ok(entry)
    }

    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn time_origin(&self) -> f64 {
        self.time_origin
    }

    fn get_entries(&self) -> Vec<PerformanceEntry> {
        Self::sorted(lock(&self.entries).clone())
    }

    fn get_entries_by_type(&self, kind: EntryKind) -> Vec<PerformanceEntry> {
        let entries = lock(&self.entries);
        Self::sorted(entries.iter().filter(|e| e.kind == kind).cloned().collect())
    }

    fn get_entries_by_name(&self, name: &str, kind: Option<EntryKind>) -> Vec<PerformanceEntry> {
        let entries = lock(&self.entries);
        Self::sorted(
            entries
                .iter()
                .filter(|e| e.name == name && kind.map_or(true, |k| e.kind == k))
                .cloned()
                .collect(),
        )
    }

    fn clear_marks(&self, name: Option<&str>) {
        self.clear_kind(EntryKind::Mark, name);
    }

    fn clear_measures(&self, name: Option<&str>) {
        self.clear_kind(EntryKind::Measure, name);
    }

    fn to_json(&self) -> RegistryResult<Value> {
        Ok(serde_json::to_value(RegistrySnapshot {
            time_origin: self.time_origin,
        })?)
    }

    fn add_event_listener(&self, event_type: &str, listener: &EventListener, options: ListenerOptions) {
        let mut listeners = lock(&self.listeners);
        if listeners
            .iter()
            .any(|slot| slot.matches(event_type, listener, options.capture))
        {
            return;
        }
        listeners.push(ListenerSlot {
            event_type: event_type.to_string(),
            listener: listener.clone(),
            capture: options.capture,
            once: options.once,
        });
    }

    fn remove_event_listener(&self, event_type: &str, listener: &EventListener, options: ListenerOptions) {
        lock(&self.listeners).retain(|slot| !slot.matches(event_type, listener, options.capture));
    }

    fn dispatch_event(&self, event: &Event) -> bool {
        let snapshot: Vec<ListenerSlot> = lock(&self.listeners)
            .iter()
            .filter(|slot| slot.event_type == event.event_type())
            .cloned()
            .collect();

        for slot in snapshot {
            // Skip listeners removed by an earlier callback in this dispatch.
            {
                let mut listeners = lock(&self.listeners);
                let position = listeners
                    .iter()
                    .position(|s| s.matches(&slot.event_type, &slot.listener, slot.capture));
                match position {
                    Some(index) if slot.once => {
                        listeners.remove(index);
                    }
                    Some(_) => {}
                    None => continue,
                }
            }
            slot.listener.call(event);
        }

        !event.default_prevented()
    }
}
