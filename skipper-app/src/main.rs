use anyhow::Result;
use clap::Parser;
use skipper_common::observability::{LogConfig, init_logging};
use skipper_config::{DEFAULT_CONFIG_FILE, LoggingSettings, SkipperConfig, SkipperConfigLoader};
use std::path::Path;

use cli::{Cli, Command};
use session::Session;

mod cli;
mod inspect;
mod session;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Env wins over the file; CLI flags win over both.
    let mut cfg = load_config(cli.config.as_deref())?;
    let log_path = init_logging(log_config(&cfg.logging))?;
    tracing::debug!(path = %log_path.display(), "logging initialised");

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut cfg);
            Session::open(&cfg).await?.run_until_ctrl_c().await
        }
        Command::Inspect { file } => {
            let report = inspect::inspect(&file).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<SkipperConfig> {
    let loader = match explicit {
        Some(path) => SkipperConfigLoader::new().with_file(path),
        None => SkipperConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    Ok(loader.load()?)
}

fn log_config(settings: &LoggingSettings) -> LogConfig {
    LogConfig {
        app_name: "skipper",
        log_dir: settings.dir.clone(),
        emit_stderr: settings.stderr,
        format: settings.format,
        default_filter: settings.filter.clone(),
    }
}
