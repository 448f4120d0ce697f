//! Hardware interaction modules
//!
//! Contains all low-level access to the temperature sensor and the fan GPIO line.

mod gpio;
mod sensor;

pub use gpio::{CdevLine, FanLine, GpioActuator, MockLine, MockLineProbe};
pub use sensor::{parse_temperature, TemperatureSource, ThermalZoneSensor};
