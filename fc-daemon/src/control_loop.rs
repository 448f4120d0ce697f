//! Fan Control Loop
//!
//! Periodic poll -> decide -> actuate cycle for a single on/off fan.
//!
//! # Safety Features
//! - **Fail-safe start**: The fan starts OFF and the first snapshot says so
//! - **Missing data**: A failed sensor read freezes the fan in its last known state
//! - **Graceful degradation**: Sensor and GPIO failures are absorbed per tick, never fatal
//! - **Dwell time**: `min_switch_s` between transitions prevents relay chatter
//! - **Error counting**: Repeated sensor failures are logged on the 1st and every 10th
//!
//! # Logging
//! Readings and transitions are logged on separate targets so a subscriber
//! can filter them:
//! - [`READING_TARGET`] - every reading (INFO with `log_each_read`, DEBUG otherwise)
//! - [`TRANSITION_TARGET`] - fan transitions and actuation failures

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use fc_core::constants::control::{MAX_CONSECUTIVE_ERRORS, MAX_SWITCH_HISTORY};
use fc_core::data::round_tenth;
use fc_core::data::snapshot::{ACTUATION_FAILED, TEMP_READ_FAILED};
use fc_core::{
    FanConfig, FanLine, FanState, GpioActuator, HysteresisController, Snapshot, SnapshotCell,
    SwitchEvent, TemperatureSource,
};

use crate::shutdown;

/// Tracing target for temperature readings
pub const READING_TARGET: &str = "fanctrl::reading";

/// Tracing target for fan transitions
pub const TRANSITION_TARGET: &str = "fanctrl::transition";

/// Something that happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Successful reading; `fan` is the state after this tick's decision
    Reading { fan: FanState, temp_c: f64 },
    /// Sensor read failed; the fan is held in `fan`
    ReadFailed { fan: FanState, reason: String, consecutive: u32 },
    /// First successful read after a run of failures
    SensorRecovered { failures: u32 },
    /// The fan was switched
    Transition { from: FanState, to: FanState, temp_c: Option<f64> },
    /// The decided switch could not be applied; it is retried next tick
    ActuationFailed { target: FanState, reason: String },
}

/// Owns the authoritative fan state and the controller clock
pub struct ControlLoop<S, L> {
    sensor: S,
    actuator: GpioActuator<L>,
    controller: HysteresisController,
    poll_interval: Duration,
    log_each_read: bool,
    state: FanState,
    /// Monotonic time of the last transition, `None` before the first one
    last_change: Option<Instant>,
    last_change_at: DateTime<Local>,
    last_reading: Option<f64>,
    min_c: Option<f64>,
    max_c: Option<f64>,
    history: VecDeque<SwitchEvent>,
    read_failures: u32,
    snapshots: Arc<SnapshotCell>,
    version: String,
}

impl<S, L> ControlLoop<S, L>
where
    S: TemperatureSource,
    L: FanLine,
{
    /// Build the loop in its failsafe state (fan OFF, no reading)
    ///
    /// `snapshots` should already hold the failsafe snapshot; the loop replaces
    /// it after every tick.
    pub fn new(
        config: &FanConfig,
        sensor: S,
        actuator: GpioActuator<L>,
        snapshots: Arc<SnapshotCell>,
        version: impl Into<String>,
    ) -> Self {
        let controller = config.controller();
        if controller.is_band_collapsed() {
            warn!(
                "Hysteresis band collapsed (temp_on_c={}, temp_off_c={}); switching on and off at {}C",
                controller.temp_on_c(),
                controller.temp_off_c(),
                controller.temp_on_c()
            );
        }

        Self {
            sensor,
            actuator,
            controller,
            poll_interval: config.poll_interval(),
            log_each_read: config.log_each_read,
            state: FanState::Off,
            last_change: None,
            last_change_at: Local::now(),
            last_reading: None,
            min_c: None,
            max_c: None,
            history: VecDeque::with_capacity(MAX_SWITCH_HISTORY + 1),
            read_failures: 0,
            snapshots,
            version: version.into(),
        }
    }

    pub fn state(&self) -> FanState {
        self.state
    }

    /// Run one poll cycle at monotonic time `now` and publish the result
    pub fn tick(&mut self, now: Instant) -> Vec<ControlEvent> {
        let mut events = Vec::new();

        let reading = match self.sensor.read_celsius() {
            Ok(temp) => {
                if self.read_failures > 0 {
                    events.push(ControlEvent::SensorRecovered { failures: self.read_failures });
                    self.read_failures = 0;
                }
                self.min_c = Some(self.min_c.map_or(temp, |m| m.min(temp)));
                self.max_c = Some(self.max_c.map_or(temp, |m| m.max(temp)));
                Some(temp)
            }
            Err(e) => {
                self.read_failures = self.read_failures.saturating_add(1);
                events.push(ControlEvent::ReadFailed {
                    fan: self.state,
                    reason: e.to_string(),
                    consecutive: self.read_failures,
                });
                None
            }
        };
        self.last_reading = reading;

        let since_last_change = self
            .last_change
            .map_or(Duration::MAX, |at| now.saturating_duration_since(at));
        let next = self.controller.decide(self.state, reading, since_last_change);

        let mut actuation_failed = false;
        if next != self.state {
            match self.actuator.set(next) {
                Ok(_) => {
                    events.push(ControlEvent::Transition {
                        from: self.state,
                        to: next,
                        temp_c: reading,
                    });
                    self.state = next;
                    self.last_change = Some(now);
                    self.last_change_at = Local::now();
                    self.record_switch(reading);
                }
                Err(e) => {
                    actuation_failed = true;
                    events.push(ControlEvent::ActuationFailed {
                        target: next,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let Some(temp_c) = reading {
            events.push(ControlEvent::Reading { fan: self.state, temp_c });
        }

        let error = if reading.is_none() {
            Some(TEMP_READ_FAILED)
        } else if actuation_failed {
            Some(ACTUATION_FAILED)
        } else {
            None
        };
        self.publish(error);

        events
    }

    fn record_switch(&mut self, temp_c: Option<f64>) {
        self.history.push_back(SwitchEvent {
            at: self.last_change_at,
            fan_on: self.state.is_on(),
            temp_c: temp_c.map(round_tenth),
            temp_on_c: self.controller.temp_on_c(),
            temp_off_c: self.controller.temp_off_c(),
        });
        while self.history.len() > MAX_SWITCH_HISTORY {
            self.history.pop_front();
        }
    }

    fn publish(&self, error: Option<&str>) {
        self.snapshots.publish(Snapshot {
            fan_on: self.state.is_on(),
            temp_c: self.last_reading.map(round_tenth),
            temp_on_c: self.controller.temp_on_c(),
            temp_off_c: self.controller.temp_off_c(),
            last_change_at: self.last_change_at,
            updated_at: Local::now(),
            version: self.version.clone(),
            min_c: self.min_c.map(round_tenth),
            max_c: self.max_c.map(round_tenth),
            error: error.map(str::to_string),
            switchpoints: self.history.iter().cloned().collect(),
        });
    }

    /// Drive the fan OFF before exit (best effort)
    pub fn shutdown_fan(&mut self) {
        match self.actuator.set(FanState::Off) {
            Ok(_) => {
                info!(target: TRANSITION_TARGET, "SHUTDOWN: Fan OFF; {}", format_context(&self.controller, self.last_reading));
                if self.state != FanState::Off {
                    self.state = FanState::Off;
                    self.last_change_at = Local::now();
                }
                self.publish(None);
            }
            Err(e) => {
                error!(target: TRANSITION_TARGET, "SHUTDOWN: Failed to drive fan OFF: {}", e);
            }
        }
    }

    fn log_event(&self, event: &ControlEvent) {
        match event {
            ControlEvent::Reading { fan, temp_c } => {
                let context = format_context(&self.controller, Some(*temp_c));
                if self.log_each_read {
                    info!(target: READING_TARGET, "Temp; fan {}; {}", fan, context);
                } else {
                    debug!(target: READING_TARGET, "Temp; fan {}; {}", fan, context);
                }
            }
            ControlEvent::ReadFailed { fan, reason, consecutive } => {
                if *consecutive == 1 || consecutive % MAX_CONSECUTIVE_ERRORS == 0 {
                    warn!(
                        target: READING_TARGET,
                        "Temp read failed (attempt {}): {}; holding fan {}; {}",
                        consecutive,
                        reason,
                        fan,
                        format_context(&self.controller, None)
                    );
                } else {
                    debug!(target: READING_TARGET, "Temp read failed (attempt {}): {}", consecutive, reason);
                }
            }
            ControlEvent::SensorRecovered { failures } => {
                info!(target: READING_TARGET, "Temp readings recovered after {} failures", failures);
            }
            ControlEvent::Transition { to, temp_c, .. } => {
                info!(target: TRANSITION_TARGET, "Fan {}; {}", to, format_context(&self.controller, *temp_c));
            }
            ControlEvent::ActuationFailed { target, reason } => {
                error!(
                    target: TRANSITION_TARGET,
                    "Failed to switch fan {}: {} - will retry next tick",
                    target,
                    reason
                );
            }
        }
    }
}

impl<S, L> ControlLoop<S, L>
where
    S: TemperatureSource + Send + 'static,
    L: FanLine + Send + 'static,
{
    /// Tick every `poll_interval` until shutdown is requested, then drive the fan OFF
    ///
    /// Ticks never overlap: a slow tick delays the next one instead of
    /// bursting to catch up. Sensor and GPIO I/O run via `block_in_place`, so
    /// this must be spawned on the multi-threaded runtime.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "Fan control loop starting: poll={:?} min_switch={:?} {}",
            self.poll_interval,
            self.controller.min_switch(),
            format_context(&self.controller, None)
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown::requested(&mut shutdown_rx) => {
                    info!("Fan control loop shutting down");
                    break;
                }
            }

            let events = tokio::task::block_in_place(|| self.tick(Instant::now()));
            for event in &events {
                self.log_event(event);
            }
        }

        self.shutdown_fan();
        info!("Fan control loop stopped");
    }
}

/// "temp=56.2C on=55.0C off=45.0C", or "temp=unknown ..." without a reading
pub fn format_context(controller: &HysteresisController, temp_c: Option<f64>) -> String {
    let temp = match temp_c {
        Some(t) => format!("temp={:.1}C", t),
        None => "temp=unknown".to_string(),
    };
    format!(
        "{} on={:.1}C off={:.1}C",
        temp,
        controller.temp_on_c(),
        controller.temp_off_c()
    )
}
