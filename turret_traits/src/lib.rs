//! Hardware capability traits for the turret.
//!
//! Everything the control core touches on the physical side goes through one of
//! these traits. Implementations live in `turret_hardware` (simulated and
//! rppal-backed) and in tests.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Optical encoder behind the slotted disk.
///
/// `read` returns the analog level on a 10-bit scale (0..=1023); the tracker
/// compares it against the hysteresis thresholds.
pub trait EncoderSensor {
    fn read(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>>;
}

/// H-bridge style DC motor driver: two direction lines plus one PWM duty output.
pub trait MotorDriver {
    fn set_direction(
        &mut self,
        in1: bool,
        in2: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_duty(&mut self, duty: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Distance sensor mounted on the turret; polled on demand.
pub trait RangeFinder {
    /// Distance in centimetres.
    fn distance(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>>;
}

/// Sink for encoder and distance samples.
pub trait Telemetry {
    fn encoder(
        &mut self,
        tick: u16,
        rotation: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn distance(&mut self, cm: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// RGB status indicator.
pub trait StatusLed {
    fn set_color(&mut self, rgb: [u8; 3]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: EncoderSensor + ?Sized> EncoderSensor for Box<T> {
    fn read(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}

impl<T: MotorDriver + ?Sized> MotorDriver for Box<T> {
    fn set_direction(
        &mut self,
        in1: bool,
        in2: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_direction(in1, in2)
    }
    fn set_duty(&mut self, duty: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_duty(duty)
    }
}

impl<T: RangeFinder + ?Sized> RangeFinder for Box<T> {
    fn distance(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        (**self).distance()
    }
}

impl<T: Telemetry + ?Sized> Telemetry for Box<T> {
    fn encoder(
        &mut self,
        tick: u16,
        rotation: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).encoder(tick, rotation)
    }
    fn distance(&mut self, cm: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).distance(cm)
    }
}

impl<T: StatusLed + ?Sized> StatusLed for Box<T> {
    fn set_color(&mut self, rgb: [u8; 3]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_color(rgb)
    }
}
