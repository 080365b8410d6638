use rstest::rstest;
use turret_config::load_toml;

const MINIMAL: &str = r#"
[pins]
motor_pwm = 18
motor_in1 = 23
motor_in2 = 24
"#;

fn with(extra: &str) -> String {
    format!("{MINIMAL}\n{extra}")
}

#[test]
fn minimal_config_uses_defaults() {
    let cfg = load_toml(MINIMAL).expect("parse TOML");
    cfg.validate().expect("minimal config is valid");
    assert_eq!(cfg.runner.serial_poll_ms, 100);
    assert_eq!(cfg.calibration.max_attempts, 1);
    assert!(cfg.calibration.timeout_ms.is_none());
    assert!(cfg.controller.integral_limit.is_none());
    assert_eq!(cfg.encoder.i2c_address, 0x48);
    assert_eq!(cfg.lidar.i2c_address, 0x62);
    assert!(cfg.lidar.distance_on_tick);
    assert_eq!(cfg.sim.slots, 38);
    assert!(cfg.pins.led().is_none());
}

#[test]
fn missing_pins_section_fails_to_parse() {
    assert!(load_toml("[runner]\nserial_poll_ms = 50\n").is_err());
}

#[test]
fn full_config_round_trips_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("turret.toml");
    std::fs::write(
        &path,
        r#"
[pins]
motor_pwm = 18
motor_in1 = 23
motor_in2 = 24
led_red = 17
led_green = 27
led_blue = 22

[encoder]
i2c_address = 0x49
channel = 1

[lidar]
enabled = true
distance_on_tick = false

[calibration]
timeout_ms = 5000
max_attempts = 3

[controller]
integral_limit = 2000

[runner]
serial_poll_ms = 50
sample_rate_hz = 800
autostart = true

[logging]
level = "debug"
rotation = "daily"

[hardware]
i2c_timeout_ms = 20

[sim]
home_slot = 5
sample_period_us = 250
"#,
    )
    .expect("write config");

    let text = std::fs::read_to_string(&path).expect("read back");
    let cfg = load_toml(&text).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.pins.led(), Some([17, 27, 22]));
    assert_eq!(cfg.encoder.channel, 1);
    assert_eq!(cfg.calibration.timeout_ms, Some(5000));
    assert_eq!(cfg.controller.integral_limit, Some(2000));
    assert!(cfg.runner.autostart);
    assert!(!cfg.lidar.distance_on_tick);
    assert_eq!(cfg.sim.home_slot, 5);
}

#[rstest]
#[case("[calibration]\nmax_attempts = 0", "max_attempts must be >= 1")]
#[case("[calibration]\ntimeout_ms = 0", "timeout_ms must be >= 1")]
#[case("[controller]\nintegral_limit = -5", "integral_limit must be > 0")]
#[case("[runner]\nserial_poll_ms = 0", "serial_poll_ms must be >= 1")]
#[case("[runner]\nsample_rate_hz = 0", "sample_rate_hz must be > 0")]
#[case("[encoder]\nchannel = 4", "encoder.channel")]
#[case("[lidar]\ni2c_address = 0x48", "collides")]
#[case("[hardware]\ni2c_timeout_ms = 0", "i2c_timeout_ms")]
#[case("[sim]\nhome_slot = 38", "home_slot must be < sim.slots")]
#[case("[sim]\nhome_width = 1.0", "home_width")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_invalid_sections(#[case] extra: &str, #[case] needle: &str) {
    let cfg = load_toml(&with(extra)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err:?} does not mention {needle:?}"
    );
}

#[test]
fn rejects_duplicate_pins() {
    let toml = r#"
[pins]
motor_pwm = 18
motor_in1 = 18
motor_in2 = 24
"#;
    let err = load_toml(toml).unwrap().validate().expect_err("dup pins");
    assert!(format!("{err}").contains("distinct"));
}

#[test]
fn rejects_partial_led_wiring() {
    let err = load_toml(&MINIMAL.replace("motor_in2 = 24", "motor_in2 = 24\nled_red = 17"))
        .unwrap()
        .validate()
        .expect_err("partial led");
    assert!(format!("{err}").contains("set together"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/turret_config.toml")).expect("parse sample");
    cfg.validate().expect("sample config is valid");
    assert!(cfg.sim.realtime);
    assert_eq!(cfg.calibration.max_attempts, 2);
}
