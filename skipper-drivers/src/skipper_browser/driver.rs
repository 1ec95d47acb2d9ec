use crate::skipper_browser::page::WebDriverHost;
use crate::skipper_browser::scripts::PageScripts;
use anyhow::Context;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use skipper_common::{Result, SkipperError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use url::Url;
use webdriver::capabilities::Capabilities;

const READY_POLL: Duration = Duration::from_millis(100);

/// Launch options for the browser behind the WebDriver service.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// WebDriver endpoint, e.g. chromedriver on `http://localhost:9515`.
    pub webdriver_url: String,
    pub headless: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: false,
        }
    }
}

/// Build the capabilities sent with the new-session request.
pub fn build_capabilities(options: &DriverOptions) -> Capabilities {
    let mut caps = Capabilities::new();

    #[cfg(feature = "chromium")]
    {
        let mut args = vec![json!("--disable-dev-shm-usage"), json!("--no-first-run")];
        if options.headless {
            args.push(json!("--headless=new"));
            args.push(json!("--disable-gpu"));
        }
        let mut chrome_opts = std::collections::HashMap::new();
        chrome_opts.insert("args".to_string(), json!(args));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
    }

    #[cfg(not(feature = "chromium"))]
    {
        if options.headless {
            caps.insert(
                "moz:firefoxOptions".to_string(),
                json!({ "args": ["-headless"] }),
            );
        }
    }

    caps
}

/// Thin wrapper around a `fantoccini` WebDriver session for one tab.
pub struct SkipperDriver {
    pub client: Client,
}

impl SkipperDriver {
    /// Open a session on the WebDriver service named in `options`.
    pub async fn connect(options: &DriverOptions) -> Result<Self> {
        let endpoint = Url::parse(&options.webdriver_url).map_err(|e| {
            SkipperError::Config(format!("invalid WebDriver url `{}`: {e}", options.webdriver_url))
        })?;

        let client = ClientBuilder::native()
            .capabilities(build_capabilities(options))
            .connect(endpoint.as_str())
            .await
            .with_context(|| format!("failed to open a WebDriver session at {endpoint}"))?;

        info!(
            target: "skipper.driver",
            %endpoint,
            headless = options.headless,
            "WebDriver session opened"
        );
        Ok(Self { client })
    }

    /// Navigate to `url` and wait until the document reports `complete`.
    pub async fn goto(&self, url: &str, ready_timeout: Duration) -> Result<()> {
        let target = Url::parse(url)
            .map_err(|e| SkipperError::Config(format!("invalid target url `{url}`: {e}")))?;

        self.client
            .goto(target.as_str())
            .await
            .with_context(|| format!("navigation to {target} failed"))?;
        info!(target: "skipper.driver", url = %target, "navigated");

        self.wait_until_ready(ready_timeout).await
    }

    /// Poll `document.readyState` until it is `complete`.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            let state = self
                .client
                .execute(PageScripts::ready_state(), vec![])
                .await
                .context("failed to read document.readyState")?;
            if state.as_str() == Some("complete") {
                debug!(
                    target: "skipper.driver",
                    waited_ms = started.elapsed().as_millis() as u64,
                    "document ready"
                );
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(SkipperError::Timeout {
                    what: "document ready",
                    waited: timeout,
                });
            }
            sleep(READY_POLL).await;
        }
    }

    /// URL of the top-level document.
    pub async fn current_url(&self) -> Result<String> {
        let url = self
            .client
            .current_url()
            .await
            .context("failed to read the current url")?;
        Ok(url.to_string())
    }

    /// A DOM host for the session's current tab.
    pub fn host(&self) -> WebDriverHost {
        WebDriverHost::new(self.client.clone())
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .context("failed to close the WebDriver session")?;
        Ok(())
    }
}
