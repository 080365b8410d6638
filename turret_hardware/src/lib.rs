//! Device implementations of the `turret_traits` capabilities.
//!
//! The simulator is always available; the rppal-backed devices need the
//! `hardware` feature and a Raspberry Pi style GPIO/I2C host.

pub mod error;
pub mod sim;
pub mod util;

#[cfg(feature = "hardware")]
pub mod ads1015;
#[cfg(feature = "hardware")]
pub mod lidar_lite;

pub use sim::{DiskCfg, SimulatedDisk};

#[cfg(feature = "hardware")]
pub use hardware::{HardwareLed, HardwareMotor};

#[cfg(feature = "hardware")]
pub mod hardware {
    use rppal::gpio::{Gpio, OutputPin};
    use tracing::debug;
    use turret_traits::{MotorDriver, StatusLed};

    use crate::error::Result;

    /// DC motor behind an H-bridge: IN1/IN2 direction lines plus a software PWM
    /// enable pin.
    pub struct HardwareMotor {
        pwm: OutputPin,
        in1: OutputPin,
        in2: OutputPin,
        pwm_hz: f64,
    }

    impl HardwareMotor {
        pub fn new(pwm_pin: u8, in1_pin: u8, in2_pin: u8, pwm_hz: f64) -> Result<Self> {
            let gpio = Gpio::new()?;
            let mut pwm = gpio.get(pwm_pin)?.into_output();
            pwm.set_low();
            let in1 = gpio.get(in1_pin)?.into_output();
            let in2 = gpio.get(in2_pin)?.into_output();
            debug!(pwm_pin, in1_pin, in2_pin, pwm_hz, "motor pins ready");
            Ok(Self {
                pwm,
                in1,
                in2,
                pwm_hz,
            })
        }
    }

    fn write_level(pin: &mut OutputPin, high: bool) {
        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }

    impl MotorDriver for HardwareMotor {
        fn set_direction(
            &mut self,
            in1: bool,
            in2: bool,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            write_level(&mut self.in1, in1);
            write_level(&mut self.in2, in2);
            Ok(())
        }

        fn set_duty(
            &mut self,
            duty: u8,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if duty == 0 {
                self.pwm.clear_pwm()?;
                self.pwm.set_low();
                return Ok(());
            }
            self.pwm
                .set_pwm_frequency(self.pwm_hz, f64::from(duty) / 255.0)?;
            Ok(())
        }
    }

    /// Common-cathode RGB LED on three software PWM pins.
    pub struct HardwareLed {
        pins: [OutputPin; 3],
        pwm_hz: f64,
    }

    impl HardwareLed {
        pub fn new(red: u8, green: u8, blue: u8, pwm_hz: f64) -> Result<Self> {
            let gpio = Gpio::new()?;
            let pins = [
                gpio.get(red)?.into_output(),
                gpio.get(green)?.into_output(),
                gpio.get(blue)?.into_output(),
            ];
            Ok(Self { pins, pwm_hz })
        }
    }

    impl StatusLed for HardwareLed {
        fn set_color(
            &mut self,
            rgb: [u8; 3],
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            for (pin, level) in self.pins.iter_mut().zip(rgb) {
                pin.set_pwm_frequency(self.pwm_hz, f64::from(level) / 255.0)?;
            }
            Ok(())
        }
    }
}
