#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Turret control core (hardware-agnostic).
//!
//! All hardware goes through the capability traits in `turret_traits`; the
//! crate itself never sleeps on wall time except through the injected `Clock`.
//!
//! ## Architecture
//!
//! - **Encoder**: hysteresis tick detection and tick/rotation counting (`encoder`)
//! - **Actuator**: signed speed to direction lines and PWM duty (`actuator`)
//! - **Controller**: per-cycle position servo on the tick count (`controller`)
//! - **Calibrator**: homing state machine on the slowest tick (`calibrator`)
//! - **Turret**: facade owning all of the above plus mode and peripherals (`turret`)
//! - **Protocol/Runner**: host line protocol and the foreground loop
//!
//! ## Single-threaded
//!
//! Sampling, control and actuation run on one thread. Commands arriving from
//! elsewhere are handed over through a channel and applied by the runner.

pub mod actuator;
pub mod axis;
pub mod builder;
pub mod calibrator;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod encoder;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod protocol;
pub mod runner;
pub mod status;
pub mod turret;
pub mod util;

pub use actuator::{Direction, MotorCommand};
pub use axis::{Axis, ServoAxis};
pub use builder::{Missing, Set, TurretBuilder};
pub use calibrator::{CalibrationPhase, CalibrationResult, CalibrationStatus, Calibrator};
pub use config::{CalibrationCfg, ControllerGains, TurretCfg};
pub use controller::{ControllerState, PositionController};
pub use encoder::{EncoderState, EncoderTracker, TickEvent};
pub use error::{BuildError, Result, TurretError};
pub use protocol::{Command, LineAssembler, ProtocolError};
pub use runner::{RunParams, RunSummary, StopReason};
pub use status::TurretMode;
pub use turret::Turret;
