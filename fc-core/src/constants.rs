//! Constants and configuration values for fanctrl
//!
//! Centralizes all magic numbers, paths, and configuration defaults.
//! Never use magic numbers in other files - add them here first.

/// System paths
pub mod paths {
    /// Configuration file used when neither the CLI nor the environment names one
    pub const DEFAULT_CONFIG_PATH: &str = "/config/config.toml";

    /// Directory holding GPIO character devices
    pub const GPIO_DEV_DIR: &str = "/dev";

    /// Socket whose presence means systemd-journald is available
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";
}

/// Environment variables read by the daemon
pub mod env {
    pub const CONFIG: &str = "FANCTRL_CONFIG";
    pub const STATUS_PORT: &str = "FANCTRL_STATUS_PORT";
    pub const BIND: &str = "FANCTRL_BIND";
    pub const MOCK_GPIO: &str = "FANCTRL_MOCK_GPIO";
    pub const LOG: &str = "FANCTRL_LOG";
}

/// Failsafe configuration defaults
///
/// Used for every field the configuration file omits, and as the replacement
/// for any value that fails validation.
pub mod defaults {
    pub const GPIO_CHIP: &str = "gpiochip0";
    pub const GPIO_PIN: u32 = 33;
    pub const ACTIVE_HIGH: bool = true;

    /// Fan switches on at or above this temperature (°C)
    pub const TEMP_ON_C: f64 = 55.0;

    /// Fan switches off at or below this temperature (°C)
    pub const TEMP_OFF_C: f64 = 45.0;

    pub const TEMP_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
    pub const POLL_INTERVAL_S: f64 = 5.0;
    pub const MIN_SWITCH_S: f64 = 10.0;
    pub const LOG_EACH_READ: bool = true;

    pub const STATUS_PORT: u16 = 9101;
    pub const BIND_ADDR: &str = "0.0.0.0";
    pub const LOG_LEVEL: &str = "info";
}

/// Temperature conversion and sanity limits
pub mod temperature {
    /// Sysfs thermal zones report millidegrees
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;

    /// Raw readings above this are assumed to be millidegrees
    pub const MILLIDEGREE_THRESHOLD: f64 = 1000.0;

    /// Lowest plausible reading (°C)
    pub const MIN_VALID_C: f64 = -40.0;

    /// Highest plausible reading (°C)
    pub const MAX_VALID_C: f64 = 150.0;
}

/// Validation limits
pub mod limits {
    /// Maximum configuration file size (64 KiB)
    pub const MAX_CONFIG_SIZE: u64 = 64 * 1024;

    /// Narrowest accepted hysteresis band (°C)
    pub const MIN_HYSTERESIS_BAND_C: f64 = 1.0;
}

/// Control loop behaviour
pub mod control {
    use std::time::Duration;

    /// Floor for the poll cadence, whatever the configuration says
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Number of transitions kept in the status history
    pub const MAX_SWITCH_HISTORY: usize = 4;

    /// Consecutive sensor failures between repeated warnings
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

    /// Consumer label attached to the requested GPIO line
    pub const GPIO_CONSUMER: &str = "fanctrl";
}
