//! GPIO fan line actuation
//!
//! [`FanLine`] is the raw primitive (drive a line high/low, read it back).
//! [`GpioActuator`] sits on top and maps [`FanState`] through the configured
//! polarity:
//!
//! - active-high: `On` = line high, `Off` = line low
//! - active-low: `On` = line low, `Off` = line high
//!
//! Two line implementations exist: [`CdevLine`] for the Linux GPIO character
//! device, and [`MockLine`] for machines without GPIO hardware and for tests.

use std::path::Path;
use std::sync::Arc;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use parking_lot::Mutex;
use tracing::debug;

use crate::constants::control;
use crate::data::FanState;
use crate::error::{FanctrlError, Result};

/// Raw output line driving the fan
pub trait FanLine {
    /// Drive the line to the given electrical level
    fn set_level(&mut self, high: bool) -> Result<()>;

    /// Current electrical level of the line
    fn level(&self) -> Result<bool>;
}

/// Output line on a Linux GPIO character device (`/dev/gpiochipN`)
///
/// The line is released when this value is dropped.
pub struct CdevLine {
    offset: u32,
    handle: LineHandle,
}

impl CdevLine {
    /// Open `chip_path` and request line `offset` as an output
    ///
    /// # Arguments
    /// * `chip_path` - Character device, e.g. /dev/gpiochip0
    /// * `offset` - Line offset on the chip
    /// * `initial_high` - Level driven as soon as the line is requested
    pub fn open(chip_path: &Path, offset: u32, initial_high: bool) -> Result<Self> {
        let chip_name = chip_path.display().to_string();

        let mut chip = Chip::new(chip_path).map_err(|e| FanctrlError::GpioChip {
            chip: chip_name.clone(),
            reason: e.to_string(),
        })?;

        let line = chip.get_line(offset).map_err(|e| FanctrlError::GpioLine {
            chip: chip_name.clone(),
            line: offset,
            reason: e.to_string(),
        })?;

        let handle = line
            .request(LineRequestFlags::OUTPUT, u8::from(initial_high), control::GPIO_CONSUMER)
            .map_err(|e| FanctrlError::GpioLine {
                chip: chip_name,
                line: offset,
                reason: e.to_string(),
            })?;

        debug!(
            "Requested {} line {} as output (initial level {})",
            chip_path.display(),
            offset,
            u8::from(initial_high)
        );
        Ok(Self { offset, handle })
    }
}

impl FanLine for CdevLine {
    fn set_level(&mut self, high: bool) -> Result<()> {
        self.handle
            .set_value(u8::from(high))
            .map_err(|e| FanctrlError::GpioWrite { line: self.offset, reason: e.to_string() })
    }

    fn level(&self) -> Result<bool> {
        self.handle
            .get_value()
            .map(|v| v != 0)
            .map_err(|e| FanctrlError::GpioRead { line: self.offset, reason: e.to_string() })
    }
}

#[derive(Debug, Default)]
struct MockLineState {
    high: bool,
    writes: usize,
    failing: bool,
}

/// In-memory fan line
///
/// Used when running without GPIO hardware. A [`MockLineProbe`] observes the
/// line and can make it fail.
#[derive(Debug)]
pub struct MockLine {
    offset: u32,
    state: Arc<Mutex<MockLineState>>,
}

impl MockLine {
    pub fn new(offset: u32, initial_high: bool) -> Self {
        Self {
            offset,
            state: Arc::new(Mutex::new(MockLineState {
                high: initial_high,
                ..MockLineState::default()
            })),
        }
    }

    pub fn probe(&self) -> MockLineProbe {
        MockLineProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl FanLine for MockLine {
    fn set_level(&mut self, high: bool) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(FanctrlError::GpioWrite {
                line: self.offset,
                reason: "mock line unavailable".to_string(),
            });
        }
        state.high = high;
        state.writes += 1;
        Ok(())
    }

    fn level(&self) -> Result<bool> {
        let state = self.state.lock();
        if state.failing {
            return Err(FanctrlError::GpioRead {
                line: self.offset,
                reason: "mock line unavailable".to_string(),
            });
        }
        Ok(state.high)
    }
}

/// Observer handle for a [`MockLine`]
#[derive(Debug, Clone)]
pub struct MockLineProbe {
    state: Arc<Mutex<MockLineState>>,
}

impl MockLineProbe {
    pub fn is_high(&self) -> bool {
        self.state.lock().high
    }

    /// Number of successful writes
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    /// Make every subsequent read and write fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }
}

/// Drives a [`FanLine`] from logical fan states
#[derive(Debug)]
pub struct GpioActuator<L> {
    line: L,
    active_high: bool,
    applied: Option<FanState>,
}

impl<L: FanLine> GpioActuator<L> {
    pub fn new(line: L, active_high: bool) -> Self {
        Self {
            line,
            active_high,
            applied: None,
        }
    }

    /// Drive the line for `state`
    ///
    /// Returns `true` when this call changed the logical state, `false` when
    /// it re-asserted the state already applied. Failures leave the recorded
    /// state untouched.
    pub fn set(&mut self, state: FanState) -> Result<bool> {
        self.line.set_level(state.line_level(self.active_high))?;
        let changed = self.applied != Some(state);
        self.applied = Some(state);
        Ok(changed)
    }

    /// Read the line back as a fan state
    pub fn state(&self) -> Result<FanState> {
        self.line
            .level()
            .map(|high| FanState::from_line_level(high, self.active_high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_high_drives_high_for_on() {
        let line = MockLine::new(33, false);
        let probe = line.probe();
        let mut actuator = GpioActuator::new(line, true);

        actuator.set(FanState::On).unwrap();
        assert!(probe.is_high());
        assert_eq!(actuator.state().unwrap(), FanState::On);

        actuator.set(FanState::Off).unwrap();
        assert!(!probe.is_high());
        assert_eq!(actuator.state().unwrap(), FanState::Off);
    }

    #[test]
    fn test_active_low_drives_low_for_on() {
        let line = MockLine::new(33, true);
        let probe = line.probe();
        let mut actuator = GpioActuator::new(line, false);

        actuator.set(FanState::On).unwrap();
        assert!(!probe.is_high());
        assert_eq!(actuator.state().unwrap(), FanState::On);

        actuator.set(FanState::Off).unwrap();
        assert!(probe.is_high());
    }

    #[test]
    fn test_set_is_idempotent() {
        let line = MockLine::new(33, false);
        let probe = line.probe();
        let mut actuator = GpioActuator::new(line, true);

        let transitions = (0..5)
            .map(|_| actuator.set(FanState::On).unwrap())
            .filter(|changed| *changed)
            .count();

        assert_eq!(transitions, 1);
        assert!(probe.is_high());
        assert_eq!(actuator.state().unwrap(), FanState::On);
    }

    #[test]
    fn test_failure_is_reported_and_not_recorded() {
        let line = MockLine::new(33, false);
        let probe = line.probe();
        let mut actuator = GpioActuator::new(line, true);
        actuator.set(FanState::Off).unwrap();

        probe.set_failing(true);
        let err = actuator.set(FanState::On).unwrap_err();
        assert!(matches!(err, FanctrlError::GpioWrite { line: 33, .. }));
        assert!(actuator.state().is_err());

        probe.set_failing(false);
        assert!(actuator.set(FanState::On).unwrap());
        assert!(probe.is_high());
    }

    #[test]
    fn test_probe_counts_writes() {
        let line = MockLine::new(4, false);
        let probe = line.probe();
        let mut actuator = GpioActuator::new(line, true);
        actuator.set(FanState::On).unwrap();
        actuator.set(FanState::On).unwrap();
        assert_eq!(probe.writes(), 2);
    }

    #[test]
    fn test_cdev_missing_chip_fails() {
        let err = CdevLine::open(Path::new("/dev/fanctrl-no-such-gpiochip"), 0, false)
            .err()
            .expect("opening a missing chip must fail");
        assert!(matches!(err, FanctrlError::GpioChip { .. }));
    }
}
