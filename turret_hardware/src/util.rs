use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `is_busy` until it reports false (device ready), or a timeout expires.
/// Sleeps in small intervals to avoid CPU spinning. Errors from the probe are
/// returned as-is.
pub fn wait_until_ready_with_timeout(
    mut is_busy: impl FnMut() -> Result<bool>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_busy()? {
        if Instant::now() >= deadline {
            return Err(HwError::Timeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
