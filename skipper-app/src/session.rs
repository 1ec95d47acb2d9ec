//! Live browser session: WebDriver connection plus the pass scheduler.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skipper_config::SkipperConfig;
use skipper_drivers::skipper_browser::driver::{DriverOptions, SkipperDriver};
use skipper_drivers::skipper_browser::page::WebDriverHost;
use skipper_engine::Scheduler;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Session {
    driver: SkipperDriver,
    host: Arc<WebDriverHost>,
    scheduler: Scheduler<WebDriverHost>,
    poll: Duration,
}

impl Session {
    /// Connect to WebDriver, open the target page and prepare the scheduler.
    pub async fn open(cfg: &SkipperConfig) -> Result<Self> {
        let options = DriverOptions {
            webdriver_url: cfg.webdriver.url.clone(),
            headless: cfg.webdriver.headless,
        };
        let driver = SkipperDriver::connect(&options).await?;

        match &cfg.target.url {
            Some(url) => driver.goto(url, cfg.webdriver.ready_timeout()).await?,
            None => {
                info!(
                    target: "skipper.driver",
                    "no target url configured, staying on the current page"
                );
                driver.wait_until_ready(cfg.webdriver.ready_timeout()).await?;
            }
        }

        let host = Arc::new(driver.host());
        let scheduler = Scheduler::new(
            host.clone(),
            cfg.scheduler.interval(),
            cfg.scheduler.timer_policy,
        );
        info!(
            target: "skipper.scheduler",
            policy = %scheduler.policy(),
            interval_ms = cfg.scheduler.interval_ms,
            "scheduler ready"
        );

        Ok(Self {
            driver,
            host,
            scheduler,
            poll: cfg.scheduler.poll(),
        })
    }

    /// Poll page signals and run passes until Ctrl-C, then shut down.
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        let cancel = CancellationToken::new();

        tokio::select! {
            _ = self.scheduler.drive(self.host.as_ref(), self.poll, cancel.clone()) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("interrupt received, shutting down");
                cancel.cancel();
            }
        }

        self.scheduler.stop();
        info!(passes = self.scheduler.passes(), "session finished");

        let Session { driver, .. } = self;
        if let Err(error) = driver.close().await {
            warn!(%error, "browser session did not close cleanly");
        }
        Ok(())
    }
}
