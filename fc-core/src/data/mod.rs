//! Data types, configuration, and snapshot modules
//!
//! Contains all core data structures and configuration management.

mod config;
pub mod snapshot;
mod types;

pub use config::{load_config, parse_config, FanConfig};
pub use snapshot::{round_tenth, Snapshot, SnapshotCell, SwitchEvent};
pub use types::FanState;
