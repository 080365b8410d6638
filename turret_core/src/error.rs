use thiserror::Error;

use crate::calibrator::CalibrationPhase;

#[derive(Debug, Error, Clone)]
pub enum TurretError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for device")]
    Timeout,
    #[error("calibration timed out in {phase:?} after {elapsed_ms} ms")]
    CalibrationTimedOut {
        phase: CalibrationPhase,
        elapsed_ms: u64,
    },
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing encoder sensor")]
    MissingEncoder,
    #[error("missing motor driver")]
    MissingMotor,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
