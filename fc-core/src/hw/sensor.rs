//! Temperature sources
//!
//! # Temperature Values
//!
//! Linux thermal zones report millidegrees Celsius (e.g. `48312` = 48.312°C).
//! Some sources already report degrees, so raw values above
//! [`temperature::MILLIDEGREE_THRESHOLD`] are treated as millidegrees and
//! anything else as degrees.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::temperature;
use crate::error::{FanctrlError, Result};

/// Anything that can produce a temperature in degrees Celsius
///
/// Failures are not distinguished by the control loop: any error means
/// "no reading this tick".
pub trait TemperatureSource {
    fn read_celsius(&mut self) -> Result<f64>;
}

/// Reads a sysfs-style temperature file
#[derive(Debug, Clone)]
pub struct ThermalZoneSensor {
    path: PathBuf,
}

impl ThermalZoneSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemperatureSource for ThermalZoneSensor {
    fn read_celsius(&mut self) -> Result<f64> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| FanctrlError::temperature(&self.path, format!("Failed to read: {}", e)))?;

        parse_temperature(&content).map_err(|reason| FanctrlError::temperature(&self.path, reason))
    }
}

/// Parse raw sensor content into degrees Celsius
///
/// Rejects empty, non-numeric, non-finite and implausible values.
pub fn parse_temperature(raw: &str) -> std::result::Result<f64, String> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|e| format!("Failed to parse '{}': {}", trimmed, e))?;

    if !value.is_finite() {
        return Err(format!("Non-finite reading '{}'", trimmed));
    }

    let celsius = if value > temperature::MILLIDEGREE_THRESHOLD {
        value / temperature::MILLIDEGREE_DIVISOR
    } else {
        value
    };

    if !(temperature::MIN_VALID_C..=temperature::MAX_VALID_C).contains(&celsius) {
        return Err(format!(
            "Reading {:.1}°C outside plausible range {}..={}°C",
            celsius,
            temperature::MIN_VALID_C,
            temperature::MAX_VALID_C
        ));
    }

    Ok(celsius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_millidegrees() {
        assert_eq!(parse_temperature("48312\n").unwrap(), 48.312);
    }

    #[test]
    fn test_parse_degrees() {
        assert_eq!(parse_temperature(" 56.2 ").unwrap(), 56.2);
        assert_eq!(parse_temperature("-5").unwrap(), -5.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_temperature("").is_err());
        assert!(parse_temperature("hot").is_err());
        assert!(parse_temperature("NaN").is_err());
        assert!(parse_temperature("inf").is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        // 200000 millidegrees = 200°C
        assert!(parse_temperature("200000").is_err());
        assert!(parse_temperature("-80").is_err());
        // Exactly 1000 is read as degrees, which is implausible
        assert!(parse_temperature("1000").is_err());
    }

    #[test]
    fn test_sensor_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp");
        fs::write(&path, "61500\n").unwrap();

        let mut sensor = ThermalZoneSensor::new(&path);
        assert_eq!(sensor.read_celsius().unwrap(), 61.5);
        assert_eq!(sensor.path(), path.as_path());
    }

    #[test]
    fn test_sensor_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut sensor = ThermalZoneSensor::new(dir.path().join("missing"));
        let err = sensor.read_celsius().unwrap_err();
        assert!(matches!(err, FanctrlError::TemperatureRead { .. }));
    }

    #[test]
    fn test_sensor_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp");
        fs::write(&path, "garbage").unwrap();

        let mut sensor = ThermalZoneSensor::new(&path);
        let err = sensor.read_celsius().unwrap_err();
        assert!(err.to_string().contains("garbage"));
    }
}
