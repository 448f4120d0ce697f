//! fanctrl Core Library
//!
//! Temperature-driven on/off fan control for single-board computers.
//!
//! # Features
//!
//! - **Hysteresis**: Separate on/off thresholds plus a minimum dwell time between switches
//! - **Sensors**: sysfs thermal zone reader with millidegree detection and range checks
//! - **GPIO**: Fan line actuation over the Linux GPIO character device, honoring polarity
//! - **Configuration**: TOML file with failsafe defaults for every field
//! - **Snapshots**: Immutable controller state published for the status endpoint
//!
//! # Module Structure
//!
//! - `hw/` - Hardware interaction (temperature sensor, GPIO line)
//! - `data/` - Data types, configuration, snapshots
//! - `engine/` - Hysteresis decision engine
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use fc_core::{FanState, HysteresisController};
//!
//! let controller = HysteresisController::new(55.0, 45.0, Duration::from_secs(10));
//! let next = controller.decide(FanState::Off, Some(56.2), Duration::from_secs(20));
//! assert_eq!(next, FanState::On);
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod error;

// Re-export primary types from data/
pub use data::{FanConfig, FanState, Snapshot, SnapshotCell, SwitchEvent};

// Re-export config functions from data/
pub use data::{load_config, parse_config};

// Re-export error types
pub use error::{FanctrlError, Result};

// Re-export engine types
pub use engine::HysteresisController;

// Re-export hardware types from hw/
pub use hw::{
    parse_temperature, CdevLine, FanLine, GpioActuator, MockLine, MockLineProbe,
    TemperatureSource, ThermalZoneSensor,
};
