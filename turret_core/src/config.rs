//! Build-time constants of the turret mechanics and runtime calibration settings.
//!
//! The constants describe one mechanical design (disk, motor, optics) and are
//! deliberately not exposed through the TOML config.

use std::time::Duration;

/// Slots on the encoder disk; one full rotation in ticks.
pub const TICKS_PER_ROTATION: u16 = 38;

/// Readings below this level count as the blocked (low) region.
pub const LOW_THRESHOLD: u16 = 300;
/// Readings above this level arm the tick latch.
pub const HIGH_THRESHOLD: u16 = 800;

/// Smallest non-zero speed the motor is commanded with (logical 0..=100 scale).
pub const MIN_SPEED: i32 = 35;
/// Largest speed magnitude (logical 0..=100 scale).
pub const MAX_SPEED: i32 = 100;
/// Speed the turret spins at once calibration hands over.
pub const DEFAULT_SPEED: i32 = 70;
/// Native duty range of the motor driver.
pub const DUTY_MAX: u8 = 255;

pub const KP: f64 = 0.75;
pub const KD: f64 = 0.75;
pub const KI: f64 = 0.001;

/// Fixed correction applied after the slowest tick is found: the true home sits
/// this many ticks forward of it. Empirical; verify on new hardware.
pub const HOME_OFFSET_TICK: u16 = 33;

/// Calibration spin-up speed.
pub const SPIN_UP_SPEED: i32 = MIN_SPEED + 10;
/// Settle time after commanding the spin-up speed, before measuring.
pub const SPIN_UP_SETTLE: Duration = Duration::from_millis(250);
/// Hold time with the motor stopped after homing.
pub const DONE_SETTLE: Duration = Duration::from_millis(1000);

/// Calibration runtime policy.
#[derive(Debug, Clone)]
pub struct CalibrationCfg {
    /// Give up after this long. `None` spins forever waiting for the encoder.
    pub timeout: Option<Duration>,
    /// Attempts made by `Turret::start` before reporting failure (>= 1).
    pub max_attempts: u32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            timeout: None,
            max_attempts: 1,
        }
    }
}

/// Gains and optional integral clamp of the position controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerGains {
    pub kp: f64,
    pub kd: f64,
    pub ki: f64,
    /// Symmetric clamp on the accumulated error. `None` keeps the unbounded
    /// accumulation the mechanical tuning was done with.
    pub integral_limit: Option<i64>,
}

impl Default for ControllerGains {
    fn default() -> Self {
        Self {
            kp: KP,
            kd: KD,
            ki: KI,
            integral_limit: None,
        }
    }
}

/// Facade-level behaviour knobs.
#[derive(Debug, Clone)]
pub struct TurretCfg {
    /// Poll the range finder after every encoder tick.
    pub distance_on_tick: bool,
}

impl Default for TurretCfg {
    fn default() -> Self {
        Self {
            distance_on_tick: true,
        }
    }
}
