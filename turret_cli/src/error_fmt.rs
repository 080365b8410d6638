//! Human-readable error descriptions and structured JSON error formatting.

use turret_core::CalibrationPhase;
use turret_core::error::{BuildError, TurretError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEncoder => {
                "What happened: No encoder sensor was provided to the turret.\nLikely causes: The ADC failed to initialize or was not wired into the builder.\nHow to fix: Ensure the encoder is created successfully and passed via with_encoder(...).".to_string()
            }
            BuildError::MissingMotor => {
                "What happened: No motor driver was provided to the turret.\nLikely causes: Motor pins failed to initialize or were not wired into the builder.\nHow to fix: Ensure the motor is created successfully and passed via with_motor(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid turret settings ({msg}).\nLikely causes: Out-of-range values in [calibration] or [controller].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TurretError>() {
        return match te {
            TurretError::CalibrationTimedOut { phase, elapsed_ms } => {
                let causes = match phase {
                    CalibrationPhase::SpinUp | CalibrationPhase::FindFirstTick => {
                        "the encoder never saw a slot edge. The optical sensor may be unplugged, the ADC channel wrong, or the disk not turning"
                    }
                    CalibrationPhase::FindSlowestTick => {
                        "the disk stopped turning before a full rotation was measured"
                    }
                    CalibrationPhase::SeekSlowestTick | CalibrationPhase::SeekHome => {
                        "the position servo could not settle on the home slot. The motor may stall at low duty or the disk may bind"
                    }
                    CalibrationPhase::Done => "the turret stalled after homing",
                };
                format!(
                    "What happened: Calibration gave up in phase {phase:?} after {elapsed_ms} ms.\nLikely causes: {causes}.\nHow to fix: Check the encoder wiring and motor supply; raise calibration.timeout_ms or calibration.max_attempts if the disk is just slow."
                )
            }
            TurretError::Timeout => {
                "What happened: An I2C device did not answer in time.\nLikely causes: ADC or range finder unpowered, wrong I2C address, or hardware.i2c_timeout_ms too low.\nHow to fix: Verify wiring with i2cdetect, check [encoder]/[lidar] addresses and raise hardware.i2c_timeout_ms.".to_string()
            }
            TurretError::Hardware(msg) | TurretError::HardwareFault(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: Loose wiring, bus contention, or missing GPIO/I2C permissions.\nHow to fix: Check the connections and run `turret self-check`."
            ),
            TurretError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: A command arrived in a mode that does not accept it.\nHow to fix: Re-run with --log-level=debug to see the command sequence."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();
    let root = err.root_cause().to_string();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file ({root}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config with the path to a turret TOML file."
        );
    }

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid or incomplete ({root}).\nLikely causes: Missing [pins] (motor_pwm, motor_in1, motor_in2) or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("open ") && (lower.contains("pins") || lower.contains("encoder") || lower.contains("range finder")) {
        return format!(
            "What happened: Failed to initialize hardware ({root}).\nLikely causes: Incorrect pin numbers or I2C address, or insufficient GPIO/I2C permissions.\nHow to fix: Fix [pins], [encoder] and [lidar] in the config; ensure the process may access /dev/gpiomem and /dev/i2c-1."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable name for the error kind, used as the JSON `reason`.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<TurretError>() {
        Some(TurretError::CalibrationTimedOut { .. }) => "CalibrationTimedOut",
        Some(TurretError::Timeout) => "Timeout",
        Some(TurretError::Hardware(_)) => "Hardware",
        Some(TurretError::HardwareFault(_)) => "HardwareFault",
        Some(TurretError::State(_)) => "State",
        None => "Error",
    }
}

/// Map the failure kind to stable exit codes; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<TurretError>() {
        Some(TurretError::CalibrationTimedOut { .. }) => 3,
        Some(TurretError::Timeout) => 4,
        Some(TurretError::Hardware(_) | TurretError::HardwareFault(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    let reason = reason_name(err);
    if let Some(TurretError::CalibrationTimedOut { phase, elapsed_ms }) =
        err.downcast_ref::<TurretError>()
    {
        return json!({
            "reason": reason,
            "details": { "phase": format!("{phase:?}"), "elapsed_ms": elapsed_ms },
            "message": msg,
        })
        .to_string();
    }
    json!({ "reason": reason, "message": msg }).to_string()
}
