//! The single rotating axis: encoder sensor, tracker, motor actuator and clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use turret_traits::clock::Clock;
use turret_traits::{EncoderSensor, MotorDriver};

use crate::actuator::{Direction, MotorActuator, MotorCommand};
use crate::encoder::{EncoderState, EncoderTracker, TickEvent};
use crate::error::Result;
use crate::hw_error::map_hw_error;

/// What the position controller and the calibrator need from an axis.
///
/// [`Axis`] is the real implementation; tests substitute scripted axes.
pub trait ServoAxis {
    /// Read the sensor once and advance the tracker.
    fn sample(&mut self) -> Result<Option<TickEvent>>;
    fn encoder(&self) -> &EncoderState;
    fn rezero(&mut self);
    fn reset_counts(&mut self);
    fn set_speed(&mut self, speed: i32);
    fn stop(&mut self);
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

pub struct Axis<E: EncoderSensor, M: MotorDriver> {
    sensor: E,
    tracker: EncoderTracker,
    actuator: MotorActuator<M>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<E: EncoderSensor, M: MotorDriver> core::fmt::Debug for Axis<E, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Axis")
            .field("encoder", self.tracker.state())
            .field("command", &self.actuator.command())
            .finish()
    }
}

impl<E: EncoderSensor, M: MotorDriver> Axis<E, M> {
    pub fn new(sensor: E, driver: M, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let tracker = EncoderTracker::new(clock.now());
        Self {
            sensor,
            tracker,
            actuator: MotorActuator::new(driver),
            clock,
        }
    }

    pub fn command(&self) -> MotorCommand {
        self.actuator.command()
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.actuator.set_direction(direction);
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }
}

impl<E: EncoderSensor, M: MotorDriver> ServoAxis for Axis<E, M> {
    fn sample(&mut self) -> Result<Option<TickEvent>> {
        let reading = self
            .sensor
            .read()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading encoder")?;
        let now = self.clock.now();
        let ev = self
            .tracker
            .sample_raw(reading, now, self.actuator.direction());
        if let Some(ev) = &ev {
            tracing::trace!(tick = ev.tick, rotation = ev.rotation, period_us = ev.period.as_micros() as u64, "tick");
        }
        Ok(ev)
    }

    fn encoder(&self) -> &EncoderState {
        self.tracker.state()
    }

    fn rezero(&mut self) {
        self.tracker.rezero();
    }

    fn reset_counts(&mut self) {
        self.tracker.reset_counts();
    }

    fn set_speed(&mut self, speed: i32) {
        self.actuator.set_speed(speed);
    }

    fn stop(&mut self) {
        self.actuator.stop();
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn sleep(&self, d: Duration) {
        self.clock.sleep(d);
    }
}
