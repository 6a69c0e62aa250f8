//! Scoped Performance
//!
//! Namespace isolation over a shared timing registry. Each
//! [`ScopedPerformance`] carries a unique scope identifier and rewrites every
//! mark and measure name to `<scope>::<name>` before forwarding it, then strips
//! the prefix again on read. Independent units of work that share one registry
//! (for example request handlers running on one runtime) can therefore use the
//! same logical names without seeing or deleting each other's entries.
//!
//! Dropping an adapter, or calling [`ScopedPerformance::close`], removes every
//! mark, measure and listener created through it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use scoped_perf::{ScopedPerformance, SharedRegistry, TimingRegistry};
//! use timing_registry::{MarkOptions, PerformanceRegistry};
//!
//! let registry: SharedRegistry = Arc::new(PerformanceRegistry::new());
//! let server = ScopedPerformance::with_scope_id(registry.clone(), "server");
//! let client = ScopedPerformance::with_scope_id(registry.clone(), "client");
//!
//! server.mark("start", MarkOptions::new()).unwrap();
//! client.mark("start", MarkOptions::new()).unwrap();
//!
//! assert_eq!(server.get_entries()[0].name, "start");
//! assert_eq!(registry.get_entries().len(), 2);
//!
//! drop(server);
//! assert_eq!(registry.get_entries()[0].name, "client::start");
//! ```
//!
//! # Caveats
//!
//! - Registry error messages show the scoped name, not the logical one.
//! - In the [`MeasureStart::Options`] form, mark names inside the options are
//!   forwarded as-is and resolve against the raw registry namespace.
//! - `to_json` and event dispatch are not partitioned by scope.

mod adapter;
mod listeners;
mod scope;

pub use adapter::{ScopeOptions, ScopedPerformance};
pub use listeners::{ListenerRegistration, ListenerRegistry};
pub use scope::{default_id_generator, IdGenerator, ScopeId, SEPARATOR};

pub use timing_registry::{
    global_registry, EntryKind, Event, EventListener, ListenerOptions, MarkOptions,
    MeasureOptions, MeasureStart, PerformanceEntry, RegistryError, RegistryResult,
    SharedRegistry, TimeRef, TimingRegistry,
};
