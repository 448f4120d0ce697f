//! Fan control engine modules
//!
//! Contains the on/off hysteresis engine.

mod hysteresis;

pub use hysteresis::HysteresisController;
