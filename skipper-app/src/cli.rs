//! Command-line definitions for `skipper`.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use skipper_common::TimerPolicy;
use skipper_config::SkipperConfig;

#[derive(Debug, Parser)]
#[command(name = "skipper")]
#[command(about = "Completes evaluation questionnaires in a WebDriver-controlled browser")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file; `skipper.yaml` in the working directory is used when present
    #[arg(short, long, env = "SKIPPER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Drive a live browser session until interrupted
    Run(RunArgs),

    /// Run one pass over a saved HTML page and print what it would do
    Inspect {
        /// Saved page to process
        file: PathBuf,
    },
}

/// Overrides applied on top of the loaded configuration.
#[derive(Debug, Default, Args)]
pub(crate) struct RunArgs {
    /// Page to open before processing starts
    #[arg(long)]
    pub url: Option<String>,

    /// WebDriver endpoint
    #[arg(long)]
    pub webdriver: Option<String>,

    /// Launch the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Milliseconds between processing passes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,

    /// Start an extra timer for every trigger instead of keeping one
    #[arg(long)]
    pub accumulate_timers: bool,
}

impl RunArgs {
    pub fn apply(&self, cfg: &mut SkipperConfig) {
        if let Some(url) = &self.url {
            cfg.target.url = Some(url.clone());
        }
        if let Some(webdriver) = &self.webdriver {
            cfg.webdriver.url = webdriver.clone();
        }
        if self.headless {
            cfg.webdriver.headless = true;
        }
        if let Some(interval_ms) = self.interval_ms {
            cfg.scheduler.interval_ms = interval_ms;
        }
        if self.accumulate_timers {
            cfg.scheduler.timer_policy = TimerPolicy::Accumulate;
        }
    }
}
