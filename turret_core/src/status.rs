//! Turret operating mode and the status colours shown for it.

/// Operating mode of the turret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurretMode {
    /// Powered up, never started (or a start failed).
    #[default]
    Idle,
    /// Calibrated and tracking; `tick()` samples and reports.
    Running,
    /// Stopped by command; motor at zero duty.
    Paused,
}

impl TurretMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TurretMode::Idle => "idle",
            TurretMode::Running => "running",
            TurretMode::Paused => "paused",
        }
    }
}

impl core::fmt::Display for TurretMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LED colour while calibrating.
pub const CALIBRATING_COLOR: [u8; 3] = [255, 0, 0];
/// LED colour once calibration has completed.
pub const READY_COLOR: [u8; 3] = [0, 255, 0];
