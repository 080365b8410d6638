//! Signed speed to H-bridge direction lines and PWM duty.

use turret_traits::MotorDriver;

use crate::config::{DUTY_MAX, MAX_SPEED, MIN_SPEED};
use crate::hw_error::map_hw_error;
use crate::util::map_range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Non-negative values are forward.
    pub fn from_signed(v: i32) -> Self {
        if v >= 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// (IN1, IN2) levels for the driver.
    pub fn lines(self) -> (bool, bool) {
        match self {
            Direction::Forward => (false, true),
            Direction::Reverse => (true, false),
        }
    }
}

/// Last command applied to the motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorCommand {
    pub direction: Direction,
    /// Logical speed, 0 or within `[MIN_SPEED, MAX_SPEED]`.
    pub magnitude: u8,
    /// Native duty written to the driver.
    pub duty: u8,
}

/// Clamp a signed speed request to a logical magnitude.
///
/// Exactly zero stops; anything else lands in `[MIN_SPEED, MAX_SPEED]`.
#[inline]
pub fn clamp_magnitude(value: i32) -> u8 {
    if value == 0 {
        return 0;
    }
    let mag = value.unsigned_abs().min(MAX_SPEED as u32) as i32;
    mag.clamp(MIN_SPEED, MAX_SPEED) as u8
}

/// Logical 0..=100 magnitude to native duty.
#[inline]
pub fn magnitude_to_duty(magnitude: u8) -> u8 {
    map_range(i32::from(magnitude), 0, 100, 0, i32::from(DUTY_MAX)) as u8
}

/// Drives a [`MotorDriver`]. Output errors are logged, never returned.
pub struct MotorActuator<M: MotorDriver> {
    driver: M,
    command: MotorCommand,
}

impl<M: MotorDriver> core::fmt::Debug for MotorActuator<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotorActuator")
            .field("command", &self.command)
            .finish()
    }
}

impl<M: MotorDriver> MotorActuator<M> {
    pub fn new(driver: M) -> Self {
        Self {
            driver,
            command: MotorCommand::default(),
        }
    }

    pub fn command(&self) -> MotorCommand {
        self.command
    }

    /// Direction the tracker counts in.
    pub fn direction(&self) -> Direction {
        self.command.direction
    }

    pub fn driver(&self) -> &M {
        &self.driver
    }

    /// Apply a signed logical speed.
    pub fn set_speed(&mut self, value: i32) {
        self.set_direction(Direction::from_signed(value));
        let magnitude = clamp_magnitude(value);
        self.write_duty(magnitude, magnitude_to_duty(magnitude));
    }

    /// Change the direction lines only; duty is untouched.
    pub fn set_direction(&mut self, direction: Direction) {
        self.command.direction = direction;
        let (in1, in2) = direction.lines();
        if let Err(e) = self.driver.set_direction(in1, in2) {
            tracing::warn!(error = %map_hw_error(&*e), ?direction, "motor direction write failed");
        }
    }

    /// Zero duty, leaving the direction lines as they are.
    pub fn stop(&mut self) {
        self.write_duty(0, 0);
    }

    fn write_duty(&mut self, magnitude: u8, duty: u8) {
        self.command.magnitude = magnitude;
        self.command.duty = duty;
        if let Err(e) = self.driver.set_duty(duty) {
            tracing::warn!(error = %map_hw_error(&*e), duty, "motor duty write failed");
        }
    }
}
