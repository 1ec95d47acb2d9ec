//! Loader for `skipper.yaml` with environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. files and inline YAML snippets, in the order they were attached,
//! 2. `SKIPPER__`-prefixed environment variables (`__` separates nesting, so
//!    `SKIPPER__SCHEDULER__INTERVAL_MS=500` sets `scheduler.interval_ms`).
//!
//! After merging, `${VAR}` placeholders inside string values are expanded from
//! the process environment. Every field has a default, so an empty
//! configuration is valid.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use skipper_common::observability::LogFormat;
use skipper_common::TimerPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Conventional file name looked up by the CLI when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "skipper.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SkipperConfig {
    pub version: Option<String>,
    pub webdriver: WebDriverSettings,
    pub target: TargetSettings,
    pub scheduler: SchedulerSettings,
    pub logging: LoggingSettings,
}

/// Where the WebDriver service lives and how the browser is launched.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    pub url: String,
    pub headless: bool,
    /// Upper bound for the first navigation to settle.
    pub ready_timeout_ms: u64,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".into(),
            headless: false,
            ready_timeout_ms: 30_000,
        }
    }
}

impl WebDriverSettings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Page the `run` command navigates to. Without it the session stays on
/// whatever page the browser opened.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Period of the repeating processing timer.
    pub interval_ms: u64,
    /// How often readiness and mutation signals are polled.
    pub poll_ms: u64,
    pub timer_policy: TimerPolicy,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_ms: skipper_common::DEFAULT_INTERVAL.as_millis() as u64,
            poll_ms: 250,
            timer_policy: TimerPolicy::Single,
        }
    }
}

impl SchedulerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: true,
            filter: "info".into(),
        }
    }
}

impl SkipperConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.interval_ms == 0 {
            return Err(ConfigError::Message(
                "scheduler.interval_ms must be greater than zero".into(),
            ));
        }
        if self.scheduler.poll_ms == 0 {
            return Err(ConfigError::Message(
                "scheduler.poll_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Expand `${VAR}` in every string of the merged tree. Expansion repeats so
/// a variable may name another one; undefined variables stay literal.
fn expand_env_in_value(value: &mut Value) {
    match value {
        Value::String(text) if text.contains('$') => *text = expand_placeholders(text),
        Value::Array(items) => items.iter_mut().for_each(expand_env_in_value),
        Value::Object(fields) => fields.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

fn expand_placeholders(text: &str) -> String {
    let mut current = text.to_owned();
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        let Ok(next) = shellexpand::env(&current) else {
            break;
        };
        if next == current {
            break;
        }
        current = next.into_owned();
    }
    current
}

/// Collects configuration sources and produces a validated [`SkipperConfig`].
pub struct SkipperConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SkipperConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipperConfigLoader {
    /// Start with no sources; `load` always adds the `SKIPPER__` environment
    /// overlay last.
    ///
    /// ```
    /// use skipper_config::SkipperConfigLoader;
    ///
    /// let config = SkipperConfigLoader::new().load().expect("defaults are valid");
    /// assert_eq!(config.scheduler.interval_ms, 300);
    /// assert_eq!(config.webdriver.url, "http://localhost:9515");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use skipper_common::TimerPolicy;
    /// use skipper_config::SkipperConfigLoader;
    ///
    /// let cfg = SkipperConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// scheduler:
    ///   interval_ms: 1000
    ///   timer_policy: accumulate
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("test"));
    /// assert_eq!(cfg.scheduler.interval_ms, 1000);
    /// assert_eq!(cfg.scheduler.poll_ms, 250);
    /// assert_eq!(cfg.scheduler.timer_policy, TimerPolicy::Accumulate);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use skipper_config::SkipperConfigLoader;
    ///
    /// unsafe { std::env::set_var("EVAL_HOST", "eval.example.edu"); }
    ///
    /// let config = SkipperConfigLoader::new()
    ///     .with_yaml_str("target:\n  url: \"https://${EVAL_HOST}/sipad\"\n")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.target.url.as_deref(), Some("https://eval.example.edu/sipad"));
    ///
    /// unsafe { std::env::remove_var("EVAL_HOST"); }
    /// ```
    pub fn load(self) -> Result<SkipperConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("SKIPPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: SkipperConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
