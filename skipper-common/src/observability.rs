//! Shared observability helpers for the Skipper binary and integration tests.
//!
//! [`init_logging`] installs the global `tracing` subscriber once: events go
//! to a daily rolling file and, optionally, to `stderr`. Later calls are
//! no-ops that hand back the log file path resolved by the first call.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Environment variable consulted when no explicit log directory is given.
pub const LOG_DIR_ENV: &str = "SKIPPER_LOG_DIR";

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging setup for one process.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the log file and the fallback data directory.
    pub app_name: &'static str,
    /// Where log files go. Falls back to `SKIPPER_LOG_DIR`, then
    /// `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    /// Mirror events to `stderr`.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "skipper",
            log_dir: None,
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let file_prefix = format!("{}.log", config.app_name);
    let log_file = dir.join(format!(
        "{file_prefix}.{}",
        Local::now().format("%Y-%m-%d")
    ));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_prefix));
    LOG_GUARD.get_or_init(|| guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let stderr = config.emit_stderr;
    let installed = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .with(stderr.then(|| fmt::layer().with_writer(std::io::stderr)))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(writer))
            .with(stderr.then(|| fmt::layer().json().with_writer(std::io::stderr)))
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    Ok(LOG_PATH.get_or_init(|| log_file).clone())
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))
        .map(|dir| expand_home(&dir))
        .unwrap_or_else(|| match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(".local/share").join(app_name),
            None => Path::new(".").join(app_name),
        })
}

/// `~/x` becomes `$HOME/x`; anything else is returned unchanged.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => Path::new(&home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve_log_dir("skipper", Some(tmp.path()));
        assert_eq!(resolved, tmp.path());
    }

    #[test]
    fn relative_paths_are_kept() {
        assert_eq!(expand_home(Path::new("logs/skipper")), PathBuf::from("logs/skipper"));
    }

    #[test]
    fn log_format_reads_lowercase() {
        let fmt: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(fmt, LogFormat::Json);
    }
}
