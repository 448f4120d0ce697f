//! Configuration management
//!
//! The configuration is a TOML file with a single `[fan]` table:
//!
//! ```toml
//! [fan]
//! gpio_chip = "gpiochip0"
//! gpio_pin = 33
//! active_high = true
//! temp_on_c = 55.0
//! temp_off_c = 45.0
//! temp_path = "/sys/class/thermal/thermal_zone0/temp"
//! poll_interval_s = 5.0
//! min_switch_s = 10.0
//! log_each_read = true
//! ```
//!
//! Every field is optional and falls back to the failsafe defaults in
//! [`crate::constants::defaults`]. Loading never decides what to do on failure:
//! callers compose [`load_config`] with `FanConfig::default()`, then run
//! [`FanConfig::sanitized`] and log whatever it reports.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{control, defaults, limits};
use crate::engine::HysteresisController;
use crate::error::{FanctrlError, Result};

/// Fan controller configuration, immutable for the process lifetime
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    /// GPIO chip name under /dev (e.g. "gpiochip0") or an absolute device path
    pub gpio_chip: String,
    /// Line offset on the chip
    pub gpio_pin: u32,
    /// Whether a high line level switches the fan on
    pub active_high: bool,
    pub temp_on_c: f64,
    pub temp_off_c: f64,
    /// Temperature source file
    pub temp_path: PathBuf,
    pub poll_interval_s: f64,
    /// Minimum dwell time in each state
    pub min_switch_s: f64,
    /// Log every reading, not just transitions
    pub log_each_read: bool,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            gpio_chip: defaults::GPIO_CHIP.to_string(),
            gpio_pin: defaults::GPIO_PIN,
            active_high: defaults::ACTIVE_HIGH,
            temp_on_c: defaults::TEMP_ON_C,
            temp_off_c: defaults::TEMP_OFF_C,
            temp_path: PathBuf::from(defaults::TEMP_PATH),
            poll_interval_s: defaults::POLL_INTERVAL_S,
            min_switch_s: defaults::MIN_SWITCH_S,
            log_each_read: defaults::LOG_EACH_READ,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    fan: FanConfig,
}

impl FanConfig {
    /// Validate the configuration, replacing bad values with failsafe defaults
    ///
    /// Returns the corrected configuration together with one error per problem found.
    /// An empty list means the configuration was used as written.
    pub fn sanitized(mut self) -> (Self, Vec<FanctrlError>) {
        let mut issues = Vec::new();

        let band_ok = self.temp_on_c.is_finite()
            && self.temp_off_c.is_finite()
            && self.temp_on_c - self.temp_off_c >= limits::MIN_HYSTERESIS_BAND_C;
        if !band_ok {
            issues.push(FanctrlError::invalid_config(
                "temp_on_c/temp_off_c",
                format!(
                    "temp_on_c={} temp_off_c={} must satisfy off < on with a band of at least {}C; using on={} off={}",
                    self.temp_on_c,
                    self.temp_off_c,
                    limits::MIN_HYSTERESIS_BAND_C,
                    defaults::TEMP_ON_C,
                    defaults::TEMP_OFF_C
                ),
            ));
            self.temp_on_c = defaults::TEMP_ON_C;
            self.temp_off_c = defaults::TEMP_OFF_C;
        }

        if !self.poll_interval_s.is_finite() || self.poll_interval_s <= 0.0 {
            issues.push(FanctrlError::invalid_config(
                "poll_interval_s",
                format!(
                    "{} must be > 0; using {}",
                    self.poll_interval_s,
                    defaults::POLL_INTERVAL_S
                ),
            ));
            self.poll_interval_s = defaults::POLL_INTERVAL_S;
        }

        if !self.min_switch_s.is_finite() || self.min_switch_s < 0.0 {
            issues.push(FanctrlError::invalid_config(
                "min_switch_s",
                format!(
                    "{} must be >= 0; using {}",
                    self.min_switch_s,
                    defaults::MIN_SWITCH_S
                ),
            ));
            self.min_switch_s = defaults::MIN_SWITCH_S;
        }

        if self.gpio_chip.trim().is_empty() {
            issues.push(FanctrlError::invalid_config(
                "gpio_chip",
                format!("must not be empty; using {}", defaults::GPIO_CHIP),
            ));
            self.gpio_chip = defaults::GPIO_CHIP.to_string();
        }

        (self, issues)
    }

    /// Poll cadence, never shorter than `control::MIN_POLL_INTERVAL`
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_s)
            .unwrap_or_else(|_| Duration::from_secs_f64(defaults::POLL_INTERVAL_S))
            .max(control::MIN_POLL_INTERVAL)
    }

    pub fn min_switch(&self) -> Duration {
        Duration::try_from_secs_f64(self.min_switch_s)
            .unwrap_or_else(|_| Duration::from_secs_f64(defaults::MIN_SWITCH_S))
    }

    /// Build the hysteresis engine for these thresholds
    pub fn controller(&self) -> HysteresisController {
        HysteresisController::new(self.temp_on_c, self.temp_off_c, self.min_switch())
    }

    /// Device path of the configured GPIO chip
    pub fn gpio_chip_path(&self) -> PathBuf {
        let chip = Path::new(&self.gpio_chip);
        if chip.is_absolute() {
            chip.to_path_buf()
        } else {
            Path::new(crate::constants::paths::GPIO_DEV_DIR).join(chip)
        }
    }
}

/// Parse a TOML configuration document
///
/// Missing fields take their defaults and unknown keys are ignored, so legacy
/// files with extra settings keep loading. Values of the wrong type are errors.
pub fn parse_config(raw: &str) -> Result<FanConfig> {
    let file: ConfigFile = toml::from_str(raw)?;
    Ok(file.fan)
}

/// Load and parse the configuration file at `path`
pub fn load_config(path: &Path) -> Result<FanConfig> {
    let metadata = fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FanctrlError::FileNotFound(path.to_path_buf())
        } else {
            FanctrlError::FileRead { path: path.to_path_buf(), source: e }
        }
    })?;

    if metadata.len() > limits::MAX_CONFIG_SIZE {
        return Err(FanctrlError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: limits::MAX_CONFIG_SIZE,
        });
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| FanctrlError::FileRead { path: path.to_path_buf(), source: e })?;

    parse_config(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            [fan]
            gpio_chip = "gpiochip1"
            gpio_pin = 17
            active_high = false
            temp_on_c = 60.0
            temp_off_c = 50.0
            temp_path = "/tmp/temp"
            poll_interval_s = 2.5
            min_switch_s = 30
            log_each_read = false
        "#;
        let cfg = parse_config(raw).unwrap();
        assert_eq!(cfg.gpio_chip, "gpiochip1");
        assert_eq!(cfg.gpio_pin, 17);
        assert!(!cfg.active_high);
        assert_eq!(cfg.temp_on_c, 60.0);
        assert_eq!(cfg.temp_off_c, 50.0);
        assert_eq!(cfg.temp_path, PathBuf::from("/tmp/temp"));
        assert_eq!(cfg.poll_interval_s, 2.5);
        assert_eq!(cfg.min_switch_s, 30.0);
        assert!(!cfg.log_each_read);
    }

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let cfg = parse_config("[fan]\ngpio_pin = 18\n").unwrap();
        assert_eq!(cfg.gpio_pin, 18);
        assert_eq!(cfg.temp_on_c, defaults::TEMP_ON_C);
        assert_eq!(cfg.temp_off_c, defaults::TEMP_OFF_C);
        assert_eq!(cfg.gpio_chip, defaults::GPIO_CHIP);
    }

    #[test]
    fn test_parse_empty_document_is_default() {
        assert_eq!(parse_config("").unwrap(), FanConfig::default());
    }

    #[test]
    fn test_parse_ignores_legacy_keys() {
        let raw = "[fan]\npin_mode = \"BCM\"\ngpio_backend = \"gpiod\"\ntemp_on_c = 58.0\n";
        let cfg = parse_config(raw).unwrap();
        assert_eq!(cfg.temp_on_c, 58.0);
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        let err = parse_config("[fan]\ngpio_pin = \"seventeen\"\n").unwrap_err();
        assert!(matches!(err, FanctrlError::TomlParse(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        assert!(parse_config("[fan\ntemp_on_c = ").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/fanctrl/config.toml")).unwrap_err();
        assert!(matches!(err, FanctrlError::FileNotFound(_)));
    }

    #[test]
    fn test_load_from_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[fan]\ntemp_on_c = 65.0\ntemp_off_c = 52.5")?;
        let cfg = load_config(file.path())?;
        assert_eq!(cfg.temp_on_c, 65.0);
        assert_eq!(cfg.temp_off_c, 52.5);
        Ok(())
    }

    #[test]
    fn test_load_rejects_oversized_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        let padding = "#".repeat(limits::MAX_CONFIG_SIZE as usize + 1);
        writeln!(file, "{}", padding)?;
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, FanctrlError::FileTooLarge { .. }));
        Ok(())
    }

    #[test]
    fn test_fallback_at_call_site() {
        let cfg = load_config(Path::new("/nonexistent.toml")).unwrap_or_default();
        assert_eq!(cfg, FanConfig::default());
    }

    #[test]
    fn test_sanitized_accepts_valid_config() {
        let (cfg, issues) = FanConfig::default().sanitized();
        assert!(issues.is_empty());
        assert_eq!(cfg, FanConfig::default());
    }

    #[test]
    fn test_sanitized_resets_inverted_thresholds() {
        let cfg = FanConfig { temp_on_c: 55.0, temp_off_c: 60.0, ..FanConfig::default() };
        let (cfg, issues) = cfg.sanitized();
        assert_eq!(issues.len(), 1);
        assert_eq!(cfg.temp_on_c, defaults::TEMP_ON_C);
        assert_eq!(cfg.temp_off_c, defaults::TEMP_OFF_C);
    }

    #[test]
    fn test_sanitized_resets_narrow_band() {
        let cfg = FanConfig { temp_on_c: 50.0, temp_off_c: 49.5, ..FanConfig::default() };
        let (cfg, issues) = cfg.sanitized();
        assert_eq!(issues.len(), 1);
        assert_eq!(cfg.temp_on_c, defaults::TEMP_ON_C);
    }

    #[test]
    fn test_sanitized_resets_nan_threshold() {
        let cfg = FanConfig { temp_on_c: f64::NAN, ..FanConfig::default() };
        let (cfg, issues) = cfg.sanitized();
        assert_eq!(issues.len(), 1);
        assert_eq!(cfg.temp_on_c, defaults::TEMP_ON_C);
    }

    #[test]
    fn test_sanitized_fixes_timing() {
        let cfg = FanConfig {
            poll_interval_s: 0.0,
            min_switch_s: -1.0,
            gpio_chip: "  ".to_string(),
            ..FanConfig::default()
        };
        let (cfg, issues) = cfg.sanitized();
        assert_eq!(issues.len(), 3);
        assert_eq!(cfg.poll_interval_s, defaults::POLL_INTERVAL_S);
        assert_eq!(cfg.min_switch_s, defaults::MIN_SWITCH_S);
        assert_eq!(cfg.gpio_chip, defaults::GPIO_CHIP);
    }

    #[test]
    fn test_gpio_chip_path() {
        let cfg = FanConfig::default();
        assert_eq!(cfg.gpio_chip_path(), PathBuf::from("/dev/gpiochip0"));

        let cfg = FanConfig { gpio_chip: "/dev/gpiochip4".to_string(), ..FanConfig::default() };
        assert_eq!(cfg.gpio_chip_path(), PathBuf::from("/dev/gpiochip4"));
    }

    #[test]
    fn test_durations() {
        let cfg = FanConfig { poll_interval_s: 0.5, min_switch_s: 10.0, ..FanConfig::default() };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.min_switch(), Duration::from_secs(10));
    }
}
