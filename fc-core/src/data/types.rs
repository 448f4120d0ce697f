//! Core data types for fan control

use std::fmt;

/// Binary fan state
///
/// Defaults to `Off`: at cold start the fan is never assumed to be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FanState {
    On,
    #[default]
    Off,
}

impl FanState {
    pub fn from_on(on: bool) -> Self {
        if on {
            FanState::On
        } else {
            FanState::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == FanState::On
    }

    /// Electrical level that realizes this state for the given polarity
    ///
    /// Returns `true` (line high) iff `(self == On) == active_high`.
    pub fn line_level(self, active_high: bool) -> bool {
        self.is_on() == active_high
    }

    /// Inverse of [`FanState::line_level`]
    pub fn from_line_level(high: bool, active_high: bool) -> Self {
        Self::from_on(high == active_high)
    }
}

impl fmt::Display for FanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanState::On => f.write_str("ON"),
            FanState::Off => f.write_str("OFF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_off() {
        assert_eq!(FanState::default(), FanState::Off);
    }

    #[test]
    fn test_line_level_polarity() {
        assert!(FanState::On.line_level(true));
        assert!(!FanState::Off.line_level(true));
        assert!(!FanState::On.line_level(false));
        assert!(FanState::Off.line_level(false));
    }

    #[test]
    fn test_from_line_level_inverts_line_level() {
        for active_high in [true, false] {
            for state in [FanState::On, FanState::Off] {
                let level = state.line_level(active_high);
                assert_eq!(FanState::from_line_level(level, active_high), state);
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(FanState::On.to_string(), "ON");
        assert_eq!(FanState::Off.to_string(), "OFF");
    }
}
