//! The turret facade: owns the axis, controller and peripherals and exposes the
//! command surface the protocol maps onto.

use std::sync::Arc;

use turret_traits::clock::Clock;
use turret_traits::{EncoderSensor, MotorDriver, RangeFinder, StatusLed, Telemetry};

use crate::actuator::{Direction, MotorCommand};
use crate::axis::{Axis, ServoAxis};
use crate::builder::{Missing, TurretBuilder};
use crate::calibrator::{CalibrationResult, Calibrator};
use crate::config::{CalibrationCfg, TurretCfg};
use crate::controller::PositionController;
use crate::encoder::{EncoderState, TickEvent};
use crate::error::{Result, TurretError};
use crate::hw_error::map_hw_error;
use crate::protocol::Command;
use crate::status::{CALIBRATING_COLOR, READY_COLOR, TurretMode};

pub(crate) type BoxedAxis = Axis<Box<dyn EncoderSensor>, Box<dyn MotorDriver>>;

pub struct Turret {
    pub(crate) axis: BoxedAxis,
    pub(crate) controller: PositionController,
    pub(crate) mode: TurretMode,
    pub(crate) range_finder: Box<dyn RangeFinder>,
    pub(crate) telemetry: Box<dyn Telemetry>,
    pub(crate) led: Option<Box<dyn StatusLed>>,
    pub(crate) calibration: CalibrationCfg,
    pub(crate) cfg: TurretCfg,
    pub(crate) last_calibration: Option<CalibrationResult>,
}

impl core::fmt::Debug for Turret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Turret")
            .field("mode", &self.mode)
            .field("encoder", self.axis.encoder())
            .field("command", &self.axis.command())
            .field("last_calibration", &self.last_calibration)
            .finish()
    }
}

impl Turret {
    /// Start building a turret.
    pub fn builder() -> TurretBuilder<Missing, Missing> {
        TurretBuilder::default()
    }

    pub fn mode(&self) -> TurretMode {
        self.mode
    }

    pub fn encoder(&self) -> &EncoderState {
        self.axis.encoder()
    }

    pub fn command(&self) -> MotorCommand {
        self.axis.command()
    }

    pub fn controller(&self) -> &PositionController {
        &self.controller
    }

    pub fn last_calibration(&self) -> Option<CalibrationResult> {
        self.last_calibration
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        self.axis.clock()
    }

    fn set_led(&mut self, rgb: [u8; 3]) {
        if let Some(led) = self.led.as_mut() {
            if let Err(e) = led.set_color(rgb) {
                tracing::warn!(error = %map_hw_error(&*e), ?rgb, "status led write failed");
            }
        }
    }

    /// Enter `Running` and calibrate.
    ///
    /// Calibration timeouts are retried up to `max_attempts`; other errors end
    /// the attempt immediately. On failure the motor is stopped, the mode falls
    /// back to `Idle` and the last error is returned.
    pub fn start(&mut self) -> Result<CalibrationResult> {
        self.mode = TurretMode::Running;
        self.set_led(CALIBRATING_COLOR);
        let attempts = self.calibration.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let mut cal = Calibrator::new(self.calibration.clone());
            match cal.run(&mut self.axis, &mut self.controller) {
                Ok(result) => {
                    self.last_calibration = Some(result);
                    self.set_led(READY_COLOR);
                    return Ok(result);
                }
                Err(e) => {
                    let timed_out = matches!(
                        e.downcast_ref::<TurretError>(),
                        Some(TurretError::CalibrationTimedOut { .. })
                    );
                    if timed_out && attempt < attempts {
                        tracing::warn!(attempt, attempts, error = %e, "calibration attempt failed, retrying");
                        attempt += 1;
                        continue;
                    }
                    self.axis.stop();
                    self.mode = TurretMode::Idle;
                    tracing::error!(attempt, error = %e, "calibration failed");
                    return Err(e);
                }
            }
        }
    }

    /// Pause: zero duty and stop sampling. Direction lines are left alone.
    pub fn stop(&mut self) {
        self.mode = TurretMode::Paused;
        self.axis.stop();
    }

    pub fn set_direction(&mut self, forward: bool) {
        let dir = if forward {
            Direction::Forward
        } else {
            Direction::Reverse
        };
        self.axis.set_direction(dir);
    }

    /// Apply a signed speed. Accepted in every mode; does not change the mode.
    pub fn set_speed(&mut self, value: i32) {
        self.axis.set_speed(value);
    }

    /// One polling cycle. Outside `Running` this does nothing.
    ///
    /// On a tick, reports `(tick, rotation)` and, when enabled, one distance
    /// sample. Telemetry and range finder failures are logged; encoder read
    /// failures are returned.
    pub fn tick(&mut self) -> Result<Option<TickEvent>> {
        if self.mode != TurretMode::Running {
            return Ok(None);
        }
        let Some(ev) = self.axis.sample()? else {
            return Ok(None);
        };
        if let Err(e) = self.telemetry.encoder(ev.tick, ev.rotation) {
            tracing::warn!(error = %e, "encoder telemetry failed");
        }
        if self.cfg.distance_on_tick {
            match self.range_finder.distance() {
                Ok(cm) => {
                    if let Err(e) = self.telemetry.distance(cm) {
                        tracing::warn!(error = %e, "distance telemetry failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %map_hw_error(&*e), "range finder read failed");
                }
            }
        }
        Ok(Some(ev))
    }

    /// Dispatch a decoded host command.
    pub fn apply(&mut self, cmd: Command) -> Result<()> {
        tracing::debug!(?cmd, mode = %self.mode, "command");
        match cmd {
            Command::Start => {
                self.start()?;
            }
            Command::Stop => self.stop(),
            Command::SetDirection { forward } => self.set_direction(forward),
            Command::SetSpeed(v) => self.set_speed(v),
        }
        Ok(())
    }
}
