//! Timing entries and the option types used to create them

use crate::error::RegistryResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Kind of a timing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A single named timestamp
    Mark,
    /// A named duration between two timestamps
    Measure,
}

impl EntryKind {
    /// The entry type string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Mark => "mark",
            EntryKind::Measure => "measure",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mark" => Ok(EntryKind::Mark),
            "measure" => Ok(EntryKind::Measure),
            _ => Err(()),
        }
    }
}

/// A timing entry recorded in the registry.
///
/// Times are milliseconds relative to the registry's time origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
    /// Entry name as stored in the registry
    pub name: String,
    /// Mark or measure
    #[serde(rename = "entryType")]
    pub kind: EntryKind,
    /// Start time in milliseconds
    pub start_time: f64,
    /// Duration in milliseconds (always 0 for marks)
    pub duration: f64,
    /// Caller-supplied payload
    pub detail: Option<Value>,
}

impl PerformanceEntry {
    /// Create a mark entry.
    pub fn mark(name: impl Into<String>, start_time: f64, detail: Option<Value>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Mark,
            start_time,
            duration: 0.0,
            detail,
        }
    }

    /// Create a measure entry.
    pub fn measure(
        name: impl Into<String>,
        start_time: f64,
        duration: f64,
        detail: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Measure,
            start_time,
            duration,
            detail,
        }
    }

    /// Whether this entry is a mark.
    #[inline]
    pub fn is_mark(&self) -> bool {
        self.kind == EntryKind::Mark
    }

    /// Whether this entry is a measure.
    #[inline]
    pub fn is_measure(&self) -> bool {
        self.kind == EntryKind::Measure
    }

    /// Copy of this entry under a different name; every other field is kept.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Serialize this entry as a JSON object.
    pub fn to_json(&self) -> RegistryResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Options accepted when creating a mark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkOptions {
    /// Explicit timestamp; defaults to the registry's current time
    pub start_time: Option<f64>,
    /// Payload stored on the entry
    pub detail: Option<Value>,
}

impl MarkOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit start time.
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Attach a detail payload.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// A point in time referenced by a measure.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeRef {
    /// The start time of the most recent mark with this name
    Mark(String),
    /// A timestamp in milliseconds
    Timestamp(f64),
}

impl From<&str> for TimeRef {
    fn from(name: &str) -> Self {
        TimeRef::Mark(name.to_string())
    }
}

impl From<String> for TimeRef {
    fn from(name: String) -> Self {
        TimeRef::Mark(name)
    }
}

impl From<f64> for TimeRef {
    fn from(ms: f64) -> Self {
        TimeRef::Timestamp(ms)
    }
}

/// Structured measure options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureOptions {
    /// Where the measure starts
    pub start: Option<TimeRef>,
    /// Where the measure ends
    pub end: Option<TimeRef>,
    /// Explicit duration, combined with either `start` or `end`
    pub duration: Option<f64>,
    /// Payload stored on the entry
    pub detail: Option<Value>,
}

impl MeasureOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start reference.
    pub fn with_start(mut self, start: impl Into<TimeRef>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Set the end reference.
    pub fn with_end(mut self, end: impl Into<TimeRef>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Set an explicit duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Attach a detail payload.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// True when no member is set.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.duration.is_none() && self.detail.is_none()
    }
}

/// The start argument of a measure call.
///
/// Either a mark name, or a structured options object in which the start is
/// encoded by its members rather than by the argument itself.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureStart {
    /// Start at the named mark
    Mark(String),
    /// Start, end, duration and detail given structurally
    Options(MeasureOptions),
}

impl MeasureStart {
    /// Start at the named mark.
    pub fn mark(name: impl Into<String>) -> Self {
        MeasureStart::Mark(name.into())
    }
}

impl From<MeasureOptions> for MeasureStart {
    fn from(options: MeasureOptions) -> Self {
        MeasureStart::Options(options)
    }
}
