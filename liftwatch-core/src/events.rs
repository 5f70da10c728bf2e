//! Detection events and the cooldown deduplicator
//!
//! A raw detection stream repeats the same object on every frame. The
//! recorder turns it into discrete events: one per label per cooldown
//! window, measured on a caller-supplied reference clock (video time for
//! both pipelines, so the window keeps a stable meaning independent of
//! client poll jitter).

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Default minimum spacing between two recorded events for the same label,
/// in reference-clock seconds.
pub const DEFAULT_COOLDOWN_SECS: f64 = 3.0;

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// A deduplicated, time-stamped record that a label was observed.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Wall-clock instant the event was recorded.
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Local>,
    /// Canonical (post-normalization) label.
    pub label: String,
    pub confidence: f32,
    /// Floor tag supplied by the caller at session start.
    pub floor: String,
    /// Reference-clock value (video-time seconds) used for deduplication.
    /// Kept on the event so the cooldown invariant is externally checkable.
    pub reference_time: f64,
}

/// Per-label cooldown filter.
///
/// Labels passed in must already be canonical; the recorder only tracks
/// spacing. `reference_time` is unit-agnostic as long as one run is
/// consistent about it.
#[derive(Debug)]
pub struct EventRecorder {
    cooldown_secs: f64,
    last_recorded: HashMap<String, f64>,
}

impl EventRecorder {
    pub fn new(cooldown_secs: f64) -> Self {
        Self {
            cooldown_secs,
            last_recorded: HashMap::new(),
        }
    }

    pub fn cooldown_secs(&self) -> f64 {
        self.cooldown_secs
    }

    /// Record an event unless the label was already recorded within the
    /// cooldown window. Spacing of exactly the cooldown interval records.
    pub fn maybe_record(
        &mut self,
        label: &str,
        confidence: f32,
        reference_time: f64,
        floor: &str,
    ) -> Option<Event> {
        let due = match self.last_recorded.get(label) {
            None => true,
            Some(last) => reference_time - last >= self.cooldown_secs,
        };
        if !due {
            return None;
        }

        self.last_recorded.insert(label.to_string(), reference_time);
        Some(Event {
            timestamp: Local::now(),
            label: label.to_string(),
            confidence,
            floor: floor.to_string(),
            reference_time,
        })
    }

    /// Forget cooldown memory. Called at the start of every run so the first
    /// sighting of each label records again; previously accumulated events
    /// are untouched (they live in the [`EventLog`], not here).
    pub fn reset(&mut self) {
        self.last_recorded.clear();
    }
}

/// Append-only, ordered event store for the lifetime of the process.
///
/// Run restarts never clear it; only an explicit [`EventLog::clear`] does.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Ordered snapshot of all recorded events.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.clone()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
