//! Shared Timing Registry
//!
//! This crate provides the process-wide timing facility that records named
//! time markers and durations:
//! - Marks: single named timestamps
//! - Measures: named durations between two timestamps
//! - Timing events: subscribe, unsubscribe and dispatch by event type
//!
//! The operation surface is the [`TimingRegistry`] trait, so callers can hold
//! an injected handle ([`SharedRegistry`]) instead of reaching for a hidden
//! singleton. [`PerformanceRegistry`] is the in-memory implementation and
//! [`global_registry`] returns the lazily created process-wide instance.
//!
//! # Example
//!
//! ```rust
//! use timing_registry::{MarkOptions, MeasureStart, PerformanceRegistry, TimingRegistry};
//!
//! let registry = PerformanceRegistry::new();
//! registry.mark("fetch-start", MarkOptions::new().with_start_time(1.0)).unwrap();
//! registry.mark("fetch-end", MarkOptions::new().with_start_time(5.0)).unwrap();
//!
//! let measure = registry
//!     .measure("fetch", Some(MeasureStart::mark("fetch-start")), Some("fetch-end"))
//!     .unwrap();
//! assert_eq!(measure.duration, 4.0);
//! ```

mod entry;
mod error;
mod event;
mod registry;

pub use entry::{EntryKind, MarkOptions, MeasureOptions, MeasureStart, PerformanceEntry, TimeRef};
pub use error::{RegistryError, RegistryResult};
pub use event::{Event, EventListener, ListenerOptions};
pub use registry::{global_registry, PerformanceRegistry, SharedRegistry, TimingRegistry};
