//! Bookkeeping of listeners subscribed through one adapter

use timing_registry::EventListener;

/// One subscription, keyed the way the registry de-duplicates it.
#[derive(Debug, Clone)]
pub struct ListenerRegistration {
    /// Event type subscribed to
    pub event_type: String,
    /// The caller's callback
    pub listener: EventListener,
    /// Normalized capture flag
    pub capture: bool,
    /// The handle actually subscribed on the registry
    pub forwarded: EventListener,
}

impl ListenerRegistration {
    /// Create a registration whose callback is subscribed directly.
    pub fn new(event_type: impl Into<String>, listener: EventListener, capture: bool) -> Self {
        Self {
            event_type: event_type.into(),
            forwarded: listener.clone(),
            listener,
            capture,
        }
    }

    /// Record that a different handle stands in for the callback on the registry.
    pub fn with_forwarded(mut self, forwarded: EventListener) -> Self {
        self.forwarded = forwarded;
        self
    }

    /// Whether this registration has the given identity.
    pub fn matches(&self, event_type: &str, listener: &EventListener, capture: bool) -> bool {
        self.event_type == event_type && self.listener == *listener && self.capture == capture
    }
}

/// The set of registrations made through one adapter, in insertion order.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    registrations: Vec<ListenerRegistration>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registration. Returns `false` if its identity was already recorded.
    pub fn record(&mut self, registration: ListenerRegistration) -> bool {
        if self
            .find(&registration.event_type, &registration.listener, registration.capture)
            .is_some()
        {
            return false;
        }
        self.registrations.push(registration);
        true
    }

    /// Look up a registration by identity.
    pub fn find(
        &self,
        event_type: &str,
        listener: &EventListener,
        capture: bool,
    ) -> Option<&ListenerRegistration> {
        self.registrations
            .iter()
            .find(|r| r.matches(event_type, listener, capture))
    }

    /// Forget a registration, returning it if it was recorded.
    pub fn forget(
        &mut self,
        event_type: &str,
        listener: &EventListener,
        capture: bool,
    ) -> Option<ListenerRegistration> {
        let index = self
            .registrations
            .iter()
            .position(|r| r.matches(event_type, listener, capture))?;
        Some(self.registrations.remove(index))
    }

    /// Take every registration, leaving the registry empty.
    pub fn drain(&mut self) -> Vec<ListenerRegistration> {
        std::mem::take(&mut self.registrations)
    }

    /// Number of recorded registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
