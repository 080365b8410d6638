//! Type-state builder for [`Turret`].
//!
//! Encoder and motor are mandatory: `build()` only exists once both are set.
//! `try_build()` is always available and checks dynamically.

use std::marker::PhantomData;
use std::sync::Arc;

use turret_traits::clock::{Clock, MonotonicClock};
use turret_traits::{EncoderSensor, MotorDriver, RangeFinder, StatusLed, Telemetry};

use crate::axis::Axis;
use crate::config::{CalibrationCfg, ControllerGains, TurretCfg};
use crate::controller::PositionController;
use crate::error::{BuildError, Result};
use crate::mocks::{NoRangeFinder, NullTelemetry};
use crate::status::TurretMode;
use crate::turret::Turret;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct TurretBuilder<E, M> {
    encoder: Option<Box<dyn EncoderSensor>>,
    motor: Option<Box<dyn MotorDriver>>,
    range_finder: Option<Box<dyn RangeFinder>>,
    telemetry: Option<Box<dyn Telemetry>>,
    led: Option<Box<dyn StatusLed>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    calibration: Option<CalibrationCfg>,
    gains: Option<ControllerGains>,
    cfg: Option<TurretCfg>,
    _e: PhantomData<E>,
    _m: PhantomData<M>,
}

impl Default for TurretBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            encoder: None,
            motor: None,
            range_finder: None,
            telemetry: None,
            led: None,
            clock: None,
            calibration: None,
            gains: None,
            cfg: None,
            _e: PhantomData,
            _m: PhantomData,
        }
    }
}

impl<E, M> TurretBuilder<E, M> {
    fn retag<E2, M2>(self) -> TurretBuilder<E2, M2> {
        TurretBuilder {
            encoder: self.encoder,
            motor: self.motor,
            range_finder: self.range_finder,
            telemetry: self.telemetry,
            led: self.led,
            clock: self.clock,
            calibration: self.calibration,
            gains: self.gains,
            cfg: self.cfg,
            _e: PhantomData,
            _m: PhantomData,
        }
    }

    pub fn with_encoder(mut self, encoder: impl EncoderSensor + 'static) -> TurretBuilder<Set, M> {
        self.encoder = Some(Box::new(encoder));
        self.retag()
    }

    pub fn with_motor(mut self, motor: impl MotorDriver + 'static) -> TurretBuilder<E, Set> {
        self.motor = Some(Box::new(motor));
        self.retag()
    }

    /// Defaults to no range finder: distance polls fail and are logged.
    pub fn with_range_finder(mut self, rf: impl RangeFinder + 'static) -> Self {
        self.range_finder = Some(Box::new(rf));
        self
    }

    /// Defaults to a sink that drops everything.
    pub fn with_telemetry(mut self, t: impl Telemetry + 'static) -> Self {
        self.telemetry = Some(Box::new(t));
        self
    }

    pub fn with_status_led(mut self, led: impl StatusLed + 'static) -> Self {
        self.led = Some(Box::new(led));
        self
    }

    /// Defaults to [`MonotonicClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_calibration(mut self, cfg: CalibrationCfg) -> Self {
        self.calibration = Some(cfg);
        self
    }

    pub fn with_gains(mut self, gains: ControllerGains) -> Self {
        self.gains = Some(gains);
        self
    }

    pub fn with_cfg(mut self, cfg: TurretCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Validate and build, reporting missing parts as [`BuildError`].
    pub fn try_build(self) -> Result<Turret> {
        let encoder = self
            .encoder
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoder))?;
        let motor = self
            .motor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let calibration = self.calibration.unwrap_or_default();
        let gains = self.gains.unwrap_or_default();
        validate(&calibration, &gains)?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let mut axis = Axis::new(encoder, motor, clock);
        // Known output state: forward lines, zero duty.
        crate::axis::ServoAxis::set_speed(&mut axis, 0);

        Ok(Turret {
            axis,
            controller: PositionController::new(gains),
            mode: TurretMode::Idle,
            range_finder: self.range_finder.unwrap_or_else(|| Box::new(NoRangeFinder)),
            telemetry: self.telemetry.unwrap_or_else(|| Box::new(NullTelemetry)),
            led: self.led,
            calibration,
            cfg: self.cfg.unwrap_or_default(),
            last_calibration: None,
        })
    }
}

impl TurretBuilder<Set, Set> {
    pub fn build(self) -> Result<Turret> {
        self.try_build()
    }
}

fn validate(calibration: &CalibrationCfg, gains: &ControllerGains) -> Result<()> {
    if calibration.max_attempts == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "calibration max_attempts must be >= 1",
        )));
    }
    if calibration.timeout.is_some_and(|t| t.is_zero()) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "calibration timeout must be > 0",
        )));
    }
    if !(gains.kp.is_finite() && gains.kd.is_finite() && gains.ki.is_finite()) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "controller gains must be finite",
        )));
    }
    if gains.integral_limit.is_some_and(|l| l <= 0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "integral_limit must be > 0",
        )));
    }
    Ok(())
}
