use std::time::Duration;

use rppal::i2c::I2c;
use tracing::{trace, warn};
use turret_traits::RangeFinder;

use crate::error::{HwError, Result};
use crate::util::wait_until_ready_with_timeout;

const REG_ACQ_COMMAND: u8 = 0x00;
const REG_STATUS: u8 = 0x01;
const REG_FULL_DELAY: u8 = 0x8f;
const ACQ_WITH_BIAS_CORRECTION: u8 = 0x04;
const STATUS_BUSY: u8 = 0x01;

/// Garmin LIDAR-Lite v3 over I2C.
pub struct LidarLite {
    i2c: I2c,
    timeout: Duration,
}

impl LidarLite {
    pub fn new(address: u16, timeout: Duration) -> Result<Self> {
        let mut i2c = I2c::new()?;
        i2c.set_slave_address(address)?;
        Ok(Self { i2c, timeout })
    }

    /// Trigger one acquisition and return the distance in centimetres.
    pub fn measure(&mut self) -> Result<u16> {
        self.i2c.write(&[REG_ACQ_COMMAND, ACQ_WITH_BIAS_CORRECTION])?;

        let i2c = &mut self.i2c;
        let waited = wait_until_ready_with_timeout(
            || {
                let mut status = [0u8; 1];
                i2c.write_read(&[REG_STATUS], &mut status)?;
                Ok(status[0] & STATUS_BUSY != 0)
            },
            self.timeout,
            Duration::from_micros(200),
        );
        if let Err(HwError::Timeout) = waited {
            warn!("lidar-lite busy past timeout");
        }
        waited?;

        let mut buf = [0u8; 2];
        self.i2c.write_read(&[REG_FULL_DELAY], &mut buf)?;
        let cm = u16::from_be_bytes(buf);
        trace!(cm, "lidar-lite distance");
        Ok(cm)
    }
}

impl RangeFinder for LidarLite {
    fn distance(&mut self) -> std::result::Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.measure()?)
    }
}
