use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid config; pins are unused by the sim backend but must be present
fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[pins]
motor_pwm = 18
motor_in1 = 23
motor_in2 = 24

[calibration]
timeout_ms = 10000

{extra}
"#
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK backend=sim encoder=", "stdout")]
#[case(&["calibrate"], 0, "calibrated: home_tick=", "stdout")]
#[case(&["spin"], 2, "unrecognized subcommand", "stderr")]
#[case(&["run", "--rt-lock", "sometimes"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = Command::cargo_bin("turret").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn self_check_reports_disabled_lidar() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[lidar]\nenabled = false");
    Command::cargo_bin("turret")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("distance_cm=disabled"));
}

#[test]
fn run_with_commands_file_streams_protocol_lines() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let commands = dir.path().join("commands.txt");
    fs::write(&commands, "B\nbogus\n").unwrap();

    let out = Command::cargo_bin("turret")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--commands")
        .arg(&commands)
        .arg("--max-run-ms")
        .arg("4000")
        .assert()
        .success()
        .stderr(predicate::str::contains("stopped (duration)"))
        .get_output()
        .clone();

    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("iamlidar"));
    // calibration rezeroes the tick count, so the first sample is tick 1
    assert_eq!(lines.next(), Some("1\t1"));
    let encoder_lines = stdout.lines().filter(|l| l.contains('\t')).count();
    assert!(encoder_lines > 38, "expected over a rotation, got {encoder_lines}");
    let distances: Vec<u16> = stdout
        .lines()
        .skip(1)
        .filter(|l| !l.contains('\t'))
        .map(|l| l.parse().expect("distance line"))
        .collect();
    assert_eq!(distances.len(), encoder_lines);
    assert!(distances.iter().all(|&cm| cm >= 250));
}

#[test]
fn run_without_start_stays_quiet() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    Command::cargo_bin("turret")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--max-run-ms")
        .arg("500")
        .assert()
        .success()
        .stdout(predicate::eq("iamlidar\n"))
        .stderr(predicate::str::contains("mode idle"));
}

#[test]
fn stdin_commands_reach_the_turret() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[sim]\nrealtime = true");
    assert_cmd::Command::cargo_bin("turret")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--max-run-ms")
        .arg("4000")
        .write_stdin("B\nM50\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("1\t1\n"))
        .stderr(predicate::str::contains("mode running"));
}

#[rstest]
#[case("[encoder]\nchannel = 7", "encoder.channel")]
#[case("[runner]\nserial_poll_ms = 0", "serial_poll_ms")]
fn invalid_config_is_explained(#[case] extra: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, extra);
    Command::cargo_bin("turret")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("What happened: Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_explained() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("turret")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("calibrate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the config file"));
}
