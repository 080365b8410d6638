//! `From` implementations bridging `turret_config` sections to core types.

use std::time::Duration;

use crate::config::{CalibrationCfg, ControllerGains, TurretCfg};
use crate::runner::RunParams;

impl From<&turret_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &turret_config::CalibrationCfg) -> Self {
        Self {
            timeout: c.timeout_ms.map(Duration::from_millis),
            max_attempts: c.max_attempts,
        }
    }
}

/// Gains stay at their compiled values; only the integral clamp is configurable.
impl From<&turret_config::ControllerCfg> for ControllerGains {
    fn from(c: &turret_config::ControllerCfg) -> Self {
        Self {
            integral_limit: c.integral_limit,
            ..Self::default()
        }
    }
}

impl From<&turret_config::LidarCfg> for TurretCfg {
    fn from(c: &turret_config::LidarCfg) -> Self {
        Self {
            distance_on_tick: c.enabled && c.distance_on_tick,
        }
    }
}

impl From<&turret_config::RunnerCfg> for RunParams {
    fn from(c: &turret_config::RunnerCfg) -> Self {
        Self {
            serial_poll: Duration::from_millis(c.serial_poll_ms),
            idle_poll: Duration::from_millis(c.idle_poll_ms),
            max_duration: None,
            sample_rate_hz: c.sample_rate_hz,
            autostart: c.autostart,
        }
    }
}
