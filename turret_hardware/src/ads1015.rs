use std::time::Duration;

use rppal::i2c::I2c;
use tracing::trace;
use turret_traits::EncoderSensor;

use crate::error::Result;
use crate::util::wait_until_ready_with_timeout;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

// Config word: OS=1 (start), MUX=AINx vs GND, PGA=±4.096V, single-shot,
// 1600 SPS, comparator disabled.
const CFG_START: u16 = 0x8000;
const CFG_PGA_4V096: u16 = 0b001 << 9;
const CFG_SINGLE_SHOT: u16 = 1 << 8;
const CFG_DR_1600: u16 = 0b100 << 5;
const CFG_COMP_DISABLE: u16 = 0b11;

/// ADS1015 12-bit ADC reading the optical encoder on one single-ended channel.
pub struct Ads1015Encoder {
    i2c: I2c,
    channel: u8,
    timeout: Duration,
}

impl Ads1015Encoder {
    pub fn new(address: u16, channel: u8, timeout: Duration) -> Result<Self> {
        if channel > 3 {
            return Err(crate::error::HwError::InvalidConfig(format!(
                "ads1015 channel {channel} out of range"
            )));
        }
        let mut i2c = I2c::new()?;
        i2c.set_slave_address(address)?;
        Ok(Self {
            i2c,
            channel,
            timeout,
        })
    }

    fn config_word(&self) -> u16 {
        let mux = (0b100 | u16::from(self.channel)) << 12;
        CFG_START | mux | CFG_PGA_4V096 | CFG_SINGLE_SHOT | CFG_DR_1600 | CFG_COMP_DISABLE
    }

    /// One single-shot conversion, normalised to the 10-bit scale.
    pub fn read_single(&mut self) -> Result<u16> {
        let [hi, lo] = self.config_word().to_be_bytes();
        self.i2c.write(&[REG_CONFIG, hi, lo])?;

        let i2c = &mut self.i2c;
        wait_until_ready_with_timeout(
            || {
                let mut cfg = [0u8; 2];
                i2c.write_read(&[REG_CONFIG], &mut cfg)?;
                // OS bit reads 0 while a conversion is in progress
                Ok(cfg[0] & 0x80 == 0)
            },
            self.timeout,
            Duration::from_micros(100),
        )?;

        let mut buf = [0u8; 2];
        self.i2c.write_read(&[REG_CONVERSION], &mut buf)?;
        let raw12 = (i16::from_be_bytes(buf) >> 4).max(0) as u32;
        let value = (raw12 * 1023 / 2047) as u16;
        trace!(raw12, value, "ads1015 read");
        Ok(value)
    }
}

impl EncoderSensor for Ads1015Encoder {
    fn read(&mut self) -> std::result::Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_single()?)
    }
}
