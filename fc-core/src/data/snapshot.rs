//! Published controller state
//!
//! The control loop is the only writer. Each poll cycle builds a complete
//! [`Snapshot`] and swaps it into the [`SnapshotCell`]; readers clone the
//! current `Arc` and never see a partially updated value. The lock is only
//! held for the pointer swap or clone, never across sensor or GPIO I/O.

use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::RwLock;

/// Error marker published when the last temperature read failed
pub const TEMP_READ_FAILED: &str = "temp_read_failed";

/// Error marker published when the last actuation failed
pub const ACTUATION_FAILED: &str = "actuation_failed";

/// A recorded fan transition
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchEvent {
    pub at: DateTime<Local>,
    pub fan_on: bool,
    pub temp_c: Option<f64>,
    pub temp_on_c: f64,
    pub temp_off_c: f64,
}

/// Immutable point-in-time record of controller state
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub fan_on: bool,
    /// Latest reading, `None` when the most recent read failed
    pub temp_c: Option<f64>,
    pub temp_on_c: f64,
    pub temp_off_c: f64,
    /// Wall-clock time of the last transition (process start before the first one)
    pub last_change_at: DateTime<Local>,
    /// Wall-clock time this snapshot was built
    pub updated_at: DateTime<Local>,
    pub version: String,
    pub min_c: Option<f64>,
    pub max_c: Option<f64>,
    pub error: Option<String>,
    /// Most recent transitions, oldest first
    pub switchpoints: Vec<SwitchEvent>,
}

impl Snapshot {
    /// The failsafe snapshot published before the first poll: fan off, no reading
    pub fn failsafe(temp_on_c: f64, temp_off_c: f64, version: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            fan_on: false,
            temp_c: None,
            temp_on_c,
            temp_off_c,
            last_change_at: now,
            updated_at: now,
            version: version.into(),
            min_c: None,
            max_c: None,
            error: None,
            switchpoints: Vec::new(),
        }
    }
}

/// Shared holder for the latest [`Snapshot`]
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotCell {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        *self.current.write() = next;
    }

    /// Latest published snapshot
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }
}

/// Round to one decimal place, the precision published to observers
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
