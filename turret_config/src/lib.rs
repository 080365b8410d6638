#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the turret.
//!
//! `Config` and its sections are deserialized from TOML and checked by
//! [`Config::validate`]. Only deployment settings live here (wiring, bus
//! addresses, timing policy, logging, simulator geometry); the mechanical
//! constants of the disk and motor are compiled into `turret_core`.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    /// BCM pin driving the motor PWM input.
    pub motor_pwm: u8,
    pub motor_in1: u8,
    pub motor_in2: u8,
    pub led_red: Option<u8>,
    pub led_green: Option<u8>,
    pub led_blue: Option<u8>,
}

impl Pins {
    /// All three LED pins, when the LED is wired.
    pub fn led(&self) -> Option<[u8; 3]> {
        Some([self.led_red?, self.led_green?, self.led_blue?])
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EncoderCfg {
    /// I2C address of the ADS1015 the optical sensor is wired to.
    pub i2c_address: u16,
    /// ADC input channel (0..=3).
    pub channel: u8,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            i2c_address: 0x48,
            channel: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LidarCfg {
    pub enabled: bool,
    pub i2c_address: u16,
    /// Take one distance sample after every encoder tick.
    pub distance_on_tick: bool,
}

impl Default for LidarCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            i2c_address: 0x62,
            distance_on_tick: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Abort calibration after this many ms; absent waits forever.
    pub timeout_ms: Option<u64>,
    /// Attempts before `start` reports failure.
    pub max_attempts: u32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            max_attempts: 1,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ControllerCfg {
    /// Clamp on the accumulated tick error; absent leaves it unbounded.
    pub integral_limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Minimum spacing between host commands (ms).
    pub serial_poll_ms: u64,
    /// Sleep per loop iteration while not running (ms).
    pub idle_poll_ms: u64,
    /// Optional pacing of the tick loop.
    pub sample_rate_hz: Option<u32>,
    /// Calibrate and start without waiting for `B`.
    pub autostart: bool,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            serial_poll_ms: 100,
            idle_poll_ms: 10,
            sample_rate_hz: None,
            autostart: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait on an I2C conversion before failing.
    pub i2c_timeout_ms: u64,
    pub motor_pwm_hz: f64,
    pub led_pwm_hz: f64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            i2c_timeout_ms: 50,
            motor_pwm_hz: 1000.0,
            led_pwm_hz: 200.0,
        }
    }
}

/// Geometry and timing of the simulated disk.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub slots: usize,
    pub home_slot: usize,
    /// Width of the reference slot relative to a regular one.
    pub home_width: f64,
    pub max_slots_per_sec: f64,
    pub sample_period_us: u64,
    pub distance_cm: u16,
    /// Let clock sleeps (idle polls, calibration holds) also wait on wall
    /// time. Encoder reads still advance simulated time only.
    pub realtime: bool,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            slots: 38,
            home_slot: 12,
            home_width: 3.0,
            max_slots_per_sec: 300.0,
            sample_period_us: 500,
            distance_cm: 250,
            realtime: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub encoder: EncoderCfg,
    #[serde(default)]
    pub lidar: LidarCfg,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub controller: ControllerCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        let mut used = vec![p.motor_pwm, p.motor_in1, p.motor_in2];
        used.extend([p.led_red, p.led_green, p.led_blue].into_iter().flatten());
        if used.iter().any(|&pin| pin > 27) {
            eyre::bail!("pins must be BCM numbers in 0..=27");
        }
        let mut sorted = used.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != used.len() {
            eyre::bail!("pins must be distinct");
        }
        let led_pins = [p.led_red, p.led_green, p.led_blue];
        let wired = led_pins.iter().filter(|x| x.is_some()).count();
        if wired != 0 && wired != 3 {
            eyre::bail!("pins.led_red, led_green and led_blue must be set together");
        }

        // Encoder
        if self.encoder.channel > 3 {
            eyre::bail!("encoder.channel must be in 0..=3");
        }
        if self.encoder.i2c_address > 0x7f {
            eyre::bail!("encoder.i2c_address must be a 7-bit address");
        }

        // Lidar
        if self.lidar.i2c_address > 0x7f {
            eyre::bail!("lidar.i2c_address must be a 7-bit address");
        }
        if self.lidar.enabled && self.lidar.i2c_address == self.encoder.i2c_address {
            eyre::bail!("lidar.i2c_address collides with encoder.i2c_address");
        }

        // Calibration
        if self.calibration.max_attempts == 0 {
            eyre::bail!("calibration.max_attempts must be >= 1");
        }
        if self.calibration.timeout_ms == Some(0) {
            eyre::bail!("calibration.timeout_ms must be >= 1 when set");
        }

        // Controller
        if let Some(limit) = self.controller.integral_limit
            && limit <= 0
        {
            eyre::bail!("controller.integral_limit must be > 0 when set");
        }

        // Runner
        if self.runner.serial_poll_ms == 0 {
            eyre::bail!("runner.serial_poll_ms must be >= 1");
        }
        if self.runner.idle_poll_ms == 0 {
            eyre::bail!("runner.idle_poll_ms must be >= 1");
        }
        if self.runner.sample_rate_hz == Some(0) {
            eyre::bail!("runner.sample_rate_hz must be > 0");
        }

        // Hardware
        if self.hardware.i2c_timeout_ms == 0 {
            eyre::bail!("hardware.i2c_timeout_ms must be >= 1");
        }
        if !(self.hardware.motor_pwm_hz.is_finite() && self.hardware.motor_pwm_hz > 0.0) {
            eyre::bail!("hardware.motor_pwm_hz must be > 0");
        }
        if !(self.hardware.led_pwm_hz.is_finite() && self.hardware.led_pwm_hz > 0.0) {
            eyre::bail!("hardware.led_pwm_hz must be > 0");
        }

        // Sim
        if self.sim.slots < 2 {
            eyre::bail!("sim.slots must be >= 2");
        }
        if self.sim.home_slot >= self.sim.slots {
            eyre::bail!("sim.home_slot must be < sim.slots");
        }
        if !(self.sim.home_width.is_finite() && self.sim.home_width > 1.0) {
            eyre::bail!("sim.home_width must be > 1.0");
        }
        if !(self.sim.max_slots_per_sec.is_finite() && self.sim.max_slots_per_sec > 0.0) {
            eyre::bail!("sim.max_slots_per_sec must be > 0");
        }
        if self.sim.sample_period_us == 0 {
            eyre::bail!("sim.sample_period_us must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
