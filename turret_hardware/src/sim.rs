//! Simulated turret: slotted disk, DC motor, range finder and status LED.
//!
//! All handles share one [`DiskModel`] and one [`ManualClock`]. Time moves
//! forward by `sample_period` on every encoder read (and on explicit clock
//! sleeps), which keeps runs deterministic and independent of wall time.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use turret_traits::{Clock, EncoderSensor, ManualClock, MotorDriver, RangeFinder, StatusLed};

use crate::error::{HwError, Result};

/// Encoder reading while the sensor sees the open part of a slot.
pub const HIGH_READING: u16 = 900;
/// Reading on the slot boundary; falls between the tracker thresholds.
pub const EDGE_READING: u16 = 550;
/// Reading while the sensor is blocked.
pub const LOW_READING: u16 = 100;

// Slot-relative widths of the blocked band and the boundary band that precedes it.
const LOW_BAND: f64 = 0.5;
const EDGE_BAND: f64 = 0.2;

/// Disk geometry and motor/sensor timing for the simulator.
#[derive(Debug, Clone)]
pub struct DiskCfg {
    /// Number of slots on the disk.
    pub slots: usize,
    /// Index of the wider reference slot.
    pub home_slot: usize,
    /// Width of the reference slot, in units of a regular slot.
    pub home_width: f64,
    /// Disk speed in slot units per second at full duty.
    pub max_slots_per_sec: f64,
    /// Simulated time between two encoder reads.
    pub sample_period: Duration,
    /// Base distance reported by the range finder.
    pub distance_cm: u16,
}

impl Default for DiskCfg {
    fn default() -> Self {
        Self {
            slots: 38,
            home_slot: 12,
            home_width: 3.0,
            max_slots_per_sec: 300.0,
            sample_period: Duration::from_micros(500),
            distance_cm: 250,
        }
    }
}

impl DiskCfg {
    pub fn validate(&self) -> Result<()> {
        if self.slots < 2 {
            return Err(HwError::InvalidConfig("disk needs at least two slots".into()));
        }
        if self.home_slot >= self.slots {
            return Err(HwError::InvalidConfig(format!(
                "home_slot {} out of range for {} slots",
                self.home_slot, self.slots
            )));
        }
        if !(self.home_width.is_finite() && self.home_width > LOW_BAND + EDGE_BAND) {
            return Err(HwError::InvalidConfig(
                "home_width must exceed the blocked band".into(),
            ));
        }
        if !(self.max_slots_per_sec.is_finite() && self.max_slots_per_sec > 0.0) {
            return Err(HwError::InvalidConfig(
                "max_slots_per_sec must be > 0".into(),
            ));
        }
        if self.sample_period.is_zero() {
            return Err(HwError::InvalidConfig("sample_period must be > 0".into()));
        }
        Ok(())
    }
}

/// Physical state shared by all simulated devices.
#[derive(Debug)]
struct DiskModel {
    cfg: DiskCfg,
    starts: Vec<f64>,
    circumference: f64,
    position: f64,
    velocity: f64,
    in1: bool,
    in2: bool,
    duty: u8,
    updated_at: Instant,
    led: [u8; 3],
    reads: u64,
}

impl DiskModel {
    fn new(cfg: DiskCfg, now: Instant) -> Self {
        let mut starts = Vec::with_capacity(cfg.slots);
        let mut acc = 0.0;
        for slot in 0..cfg.slots {
            starts.push(acc);
            acc += if slot == cfg.home_slot {
                cfg.home_width
            } else {
                1.0
            };
        }
        Self {
            cfg,
            starts,
            circumference: acc,
            position: 0.0,
            velocity: 0.0,
            in1: false,
            in2: false,
            duty: 0,
            updated_at: now,
            led: [0, 0, 0],
            reads: 0,
        }
    }

    fn width(&self, slot: usize) -> f64 {
        if slot == self.cfg.home_slot {
            self.cfg.home_width
        } else {
            1.0
        }
    }

    /// Integrate the disk position up to `now` at the current velocity.
    fn advance_to(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.updated_at).as_secs_f64();
        let mut pos = (self.position + self.velocity * dt).rem_euclid(self.circumference);
        if pos >= self.circumference {
            pos = 0.0;
        }
        self.position = pos;
        self.updated_at = now;
    }

    fn refresh_velocity(&mut self) {
        let sign = match (self.in1, self.in2) {
            (false, true) => 1.0,
            (true, false) => -1.0,
            _ => 0.0,
        };
        self.velocity = sign * self.cfg.max_slots_per_sec * f64::from(self.duty) / 255.0;
    }

    fn slot_at(&self, pos: f64) -> usize {
        let idx = self.starts.partition_point(|&s| s <= pos);
        idx.saturating_sub(1).min(self.cfg.slots - 1)
    }

    fn reading(&self) -> u16 {
        let slot = self.slot_at(self.position);
        let into = self.position - self.starts[slot];
        let width = self.width(slot);
        if into >= width - LOW_BAND {
            LOW_READING
        } else if into >= width - LOW_BAND - EDGE_BAND {
            EDGE_READING
        } else {
            HIGH_READING
        }
    }
}

/// Owner of the simulated turret; hands out device handles.
#[derive(Debug, Clone)]
pub struct SimulatedDisk {
    model: Rc<RefCell<DiskModel>>,
    clock: ManualClock,
}

impl SimulatedDisk {
    pub fn new(cfg: DiskCfg, clock: ManualClock) -> Result<Self> {
        cfg.validate()?;
        debug!(
            slots = cfg.slots,
            home_slot = cfg.home_slot,
            home_width = cfg.home_width,
            "simulated disk"
        );
        let model = DiskModel::new(cfg, clock.now());
        Ok(Self {
            model: Rc::new(RefCell::new(model)),
            clock,
        })
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn encoder(&self) -> SimulatedEncoder {
        SimulatedEncoder {
            model: self.model.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn motor(&self) -> SimulatedMotor {
        SimulatedMotor {
            model: self.model.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn range_finder(&self) -> SimulatedRangeFinder {
        SimulatedRangeFinder {
            model: self.model.clone(),
        }
    }

    pub fn led(&self) -> SimulatedLed {
        SimulatedLed {
            model: self.model.clone(),
        }
    }

    /// Slot currently in front of the sensor.
    pub fn slot_under_sensor(&self) -> usize {
        let m = self.model.borrow();
        m.slot_at(m.position)
    }

    /// Disk position in slot units, in `[0, circumference)`.
    pub fn position(&self) -> f64 {
        self.model.borrow().position
    }

    /// Signed disk speed in slot units per second.
    pub fn velocity(&self) -> f64 {
        self.model.borrow().velocity
    }

    pub fn duty(&self) -> u8 {
        self.model.borrow().duty
    }

    pub fn direction_lines(&self) -> (bool, bool) {
        let m = self.model.borrow();
        (m.in1, m.in2)
    }

    pub fn led_color(&self) -> [u8; 3] {
        self.model.borrow().led
    }

    /// Number of encoder reads served so far.
    pub fn reads(&self) -> u64 {
        self.model.borrow().reads
    }
}

/// Encoder handle; each read advances simulated time by one sample period.
#[derive(Debug)]
pub struct SimulatedEncoder {
    model: Rc<RefCell<DiskModel>>,
    clock: ManualClock,
}

impl EncoderSensor for SimulatedEncoder {
    fn read(&mut self) -> std::result::Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        let mut m = self.model.borrow_mut();
        self.clock.advance(m.cfg.sample_period);
        m.advance_to(self.clock.now());
        m.reads = m.reads.saturating_add(1);
        let reading = m.reading();
        trace!(position = m.position, reading, "sim encoder read");
        Ok(reading)
    }
}

#[derive(Debug)]
pub struct SimulatedMotor {
    model: Rc<RefCell<DiskModel>>,
    clock: ManualClock,
}

impl MotorDriver for SimulatedMotor {
    fn set_direction(
        &mut self,
        in1: bool,
        in2: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut m = self.model.borrow_mut();
        m.advance_to(self.clock.now());
        m.in1 = in1;
        m.in2 = in2;
        m.refresh_velocity();
        Ok(())
    }

    fn set_duty(
        &mut self,
        duty: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut m = self.model.borrow_mut();
        m.advance_to(self.clock.now());
        if m.duty != duty {
            trace!(duty, "sim motor duty");
        }
        m.duty = duty;
        m.refresh_velocity();
        Ok(())
    }
}

/// Range finder that reports a fixed room profile keyed by the slot in view.
#[derive(Debug)]
pub struct SimulatedRangeFinder {
    model: Rc<RefCell<DiskModel>>,
}

impl RangeFinder for SimulatedRangeFinder {
    fn distance(&mut self) -> std::result::Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        let m = self.model.borrow();
        let slot = m.slot_at(m.position);
        Ok(m.cfg.distance_cm.saturating_add(slot as u16))
    }
}

#[derive(Debug)]
pub struct SimulatedLed {
    model: Rc<RefCell<DiskModel>>,
}

impl StatusLed for SimulatedLed {
    fn set_color(
        &mut self,
        rgb: [u8; 3],
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.model.borrow_mut().led = rgb;
        Ok(())
    }
}
