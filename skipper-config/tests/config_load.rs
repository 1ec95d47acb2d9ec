use skipper_common::observability::LogFormat;
use skipper_common::TimerPolicy;
use skipper_config::SkipperConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
version: "1"
webdriver:
  url: "http://127.0.0.1:4444"
  headless: true
target:
  url: "https://${SIPAD_HOST}/Evaluation"
scheduler:
  interval_ms: 300
  timer_policy: single
logging:
  format: json
  stderr: false
"#;

#[test]
#[serial]
fn loads_file_and_expands_placeholders() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "skipper.yaml", FILE_YAML);

    let config = temp_env::with_var("SIPAD_HOST", Some("sipad.example.ac.ir"), || {
        SkipperConfigLoader::new().with_file(&p).load()
    })
    .expect("load skipper config");

    assert_eq!(config.version.as_deref(), Some("1"));
    assert_eq!(config.webdriver.url, "http://127.0.0.1:4444");
    assert!(config.webdriver.headless);
    assert_eq!(
        config.target.url.as_deref(),
        Some("https://sipad.example.ac.ir/Evaluation")
    );
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(!config.logging.stderr);
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "skipper.yaml", FILE_YAML);

    let config = temp_env::with_vars(
        [
            ("SIPAD_HOST", Some("sipad.example.ac.ir")),
            ("SKIPPER__SCHEDULER__INTERVAL_MS", Some("750")),
            ("SKIPPER__SCHEDULER__TIMER_POLICY", Some("accumulate")),
        ],
        || SkipperConfigLoader::new().with_file(&p).load(),
    )
    .expect("load with env overlay");

    assert_eq!(config.scheduler.interval_ms, 750);
    assert_eq!(config.scheduler.timer_policy, TimerPolicy::Accumulate);
    assert_eq!(config.webdriver.url, "http://127.0.0.1:4444");
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = SkipperConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");

    assert_eq!(config.scheduler.interval_ms, 300);
    assert_eq!(config.scheduler.timer_policy, TimerPolicy::Single);
    assert!(config.target.url.is_none());
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = SkipperConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn zero_poll_interval_is_rejected() {
    let result = SkipperConfigLoader::new()
        .with_yaml_str("scheduler:\n  poll_ms: 0\n")
        .load();
    assert!(result.is_err());
}
