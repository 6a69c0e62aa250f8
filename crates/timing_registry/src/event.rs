//! Timing events and listener handles

use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An event dispatched through the registry.
#[derive(Debug)]
pub struct Event {
    event_type: String,
    cancelable: bool,
    detail: Option<Value>,
    default_prevented: AtomicBool,
}

impl Event {
    /// Create a non-cancelable event.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            cancelable: false,
            detail: None,
            default_prevented: AtomicBool::new(false),
        }
    }

    /// Create an event whose default action listeners may cancel.
    pub fn cancelable(event_type: impl Into<String>) -> Self {
        Self {
            cancelable: true,
            ..Self::new(event_type)
        }
    }

    /// Attach a detail payload.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// The event type listeners are matched against.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Whether `prevent_default` has any effect.
    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// The detail payload, if any.
    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }

    /// Cancel the event. No-op on non-cancelable events.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.store(true, Ordering::SeqCst);
        }
    }

    /// Whether a listener cancelled the event.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }
}

type Callback = dyn Fn(&Event) + Send + Sync;

/// A subscribed callback.
///
/// Handles compare by identity: clones of one handle are equal, two handles
/// built from identical closures are not.
#[derive(Clone)]
pub struct EventListener {
    callback: Arc<Callback>,
}

impl EventListener {
    /// Wrap a callback in a new listener identity.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Invoke the callback.
    #[inline]
    pub fn call(&self, event: &Event) {
        (self.callback)(event)
    }
}

impl PartialEq for EventListener {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(&other.callback))
    }
}

impl Eq for EventListener {}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventListener")
            .field(&Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Options for adding or removing a listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Capture-phase registration; part of the listener's identity
    pub capture: bool,
    /// Remove the listener after its first invocation
    pub once: bool,
}

impl ListenerOptions {
    /// Default options (bubble phase, persistent).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capture flag.
    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Set the once flag.
    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Reduce to the members that identify a registration.
    pub fn normalized(&self) -> Self {
        Self {
            capture: self.capture,
            once: false,
        }
    }
}

impl From<bool> for ListenerOptions {
    fn from(capture: bool) -> Self {
        Self {
            capture,
            once: false,
        }
    }
}
