//! Hysteresis engine for on/off fan control
//!
//! Decides the next fan state from the current state, the latest reading and
//! the time since the last transition.
//!
//! # How It Works
//!
//! 1. **Missing data**: Without a reading the current state is held, whatever
//!    the dwell time.
//!
//! 2. **Dwell lock**: A state must persist for `min_switch` before another
//!    transition is allowed.
//!
//! 3. **Band**: `Off` switches on at `temp >= temp_on_c`, `On` switches off at
//!    `temp <= temp_off_c`. Readings inside the band change nothing.
//!
//! If the band is collapsed (`temp_off_c >= temp_on_c`) both transitions use
//! `temp_on_c`: on at `temp >= temp_on_c`, off at `temp < temp_on_c`. A steady
//! temperature can then never flip the state back and forth.
//!
//! The engine holds no mutable state. The caller owns the clock and passes the
//! elapsed time in.

use std::time::Duration;

use crate::data::FanState;

/// Pure on/off decision engine with thresholds and a minimum dwell time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisController {
    temp_on_c: f64,
    temp_off_c: f64,
    min_switch: Duration,
}

impl HysteresisController {
    pub fn new(temp_on_c: f64, temp_off_c: f64, min_switch: Duration) -> Self {
        Self {
            temp_on_c,
            temp_off_c,
            min_switch,
        }
    }

    pub fn temp_on_c(&self) -> f64 {
        self.temp_on_c
    }

    pub fn temp_off_c(&self) -> f64 {
        self.temp_off_c
    }

    pub fn min_switch(&self) -> Duration {
        self.min_switch
    }

    /// True when the thresholds leave no hysteresis band
    ///
    /// NaN thresholds count as collapsed.
    pub fn is_band_collapsed(&self) -> bool {
        !(self.temp_off_c < self.temp_on_c)
    }

    /// Decide the next fan state
    ///
    /// # Arguments
    /// * `current` - State the fan is in now
    /// * `temp_c` - Latest reading, `None` if the read failed
    /// * `since_last_change` - Time since the last transition (`Duration::MAX` if none yet)
    pub fn decide(&self, current: FanState, temp_c: Option<f64>, since_last_change: Duration) -> FanState {
        let temp = match temp_c {
            Some(t) if t.is_finite() => t,
            _ => return current,
        };

        if since_last_change < self.min_switch {
            return current;
        }

        match current {
            FanState::Off if temp >= self.temp_on_c => FanState::On,
            FanState::On if self.should_switch_off(temp) => FanState::Off,
            _ => current,
        }
    }

    fn should_switch_off(&self, temp: f64) -> bool {
        if self.is_band_collapsed() {
            temp < self.temp_on_c
        } else {
            temp <= self.temp_off_c
        }
    }
}
