//! Chrome session driver
//!
//! Drives a real Chromium instance over the DevTools protocol. Every launch
//! gets its own browser process so a crash only takes down one source URL.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{Locator, LocatorStrategy, SessionDriver, SessionLauncher};
use crate::infrastructure::config::BrowserConfig;
use crate::infrastructure::extraction_error::{ExtractionError, ExtractionResult};

const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Connection-level failures end the session; anything else means the node
/// simply is not there (yet)
fn is_session_fault(err: &CdpError) -> bool {
    matches!(err, CdpError::Ws(_) | CdpError::Io(_) | CdpError::ChannelSendError(_))
}

fn map_cdp_error(err: CdpError) -> ExtractionError {
    ExtractionError::session_fault(err)
}

/// One browser process with a single page
pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    async fn find_once(&self, locator: &Locator) -> Result<Element, CdpError> {
        match locator.strategy {
            LocatorStrategy::XPath => self.page.find_xpath(locator.expression.as_str()).await,
            LocatorStrategy::Css => self.page.find_element(locator.expression.as_str()).await,
        }
    }

    /// Poll for a node with exponential backoff until `timeout` elapses
    async fn wait_for_node(&self, locator: &Locator, timeout: Duration) -> ExtractionResult<Element> {
        let start = Instant::now();
        let mut poll_interval = INITIAL_POLL_INTERVAL;

        loop {
            match self.find_once(locator).await {
                Ok(element) => return Ok(element),
                Err(err) if is_session_fault(&err) => return Err(map_cdp_error(err)),
                Err(_) => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(ExtractionError::not_found_after(locator, timeout));
            }

            tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
            poll_interval = (poll_interval * 2).min(MAX_POLL_INTERVAL);
        }
    }
}

#[async_trait]
impl SessionDriver for ChromeSession {
    type Node = Element;

    async fn navigate(&self, url: &str) -> ExtractionResult<()> {
        debug!("🌐 Navigating to {}", url);
        self.page.goto(url).await.map_err(map_cdp_error)?;
        self.page.wait_for_navigation().await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn query_node(&self, locator: &Locator, timeout: Duration) -> ExtractionResult<Self::Node> {
        self.wait_for_node(locator, timeout).await
    }

    async fn scroll_into_view(&self, locator: &Locator) -> ExtractionResult<()> {
        let element = match self.find_once(locator).await {
            Ok(element) => element,
            Err(err) if is_session_fault(&err) => return Err(map_cdp_error(err)),
            Err(_) => return Err(ExtractionError::not_found(locator, 0)),
        };
        match element.scroll_into_view().await {
            Ok(_) => Ok(()),
            Err(err) if is_session_fault(&err) => Err(map_cdp_error(err)),
            Err(err) => {
                debug!("Scroll into view failed for {}: {}", locator, err);
                Err(ExtractionError::not_found(locator, 0))
            }
        }
    }

    async fn read_text(&self, node: &Self::Node) -> ExtractionResult<String> {
        match node.inner_text().await {
            Ok(text) => Ok(text.unwrap_or_default()),
            Err(err) if is_session_fault(&err) => Err(map_cdp_error(err)),
            // Detached node: treat as empty text
            Err(_) => Ok(String::new()),
        }
    }

    async fn read_attribute(&self, node: &Self::Node, name: &str) -> ExtractionResult<Option<String>> {
        match node.attribute(name).await {
            Ok(value) => Ok(value),
            Err(err) if is_session_fault(&err) => Err(map_cdp_error(err)),
            Err(_) => Ok(None),
        }
    }

    async fn click(&self, node: &Self::Node) -> ExtractionResult<()> {
        node.click().await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn close(&self) -> ExtractionResult<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("⚠️ Browser close failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Browser process wait failed: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

/// Launches one Chromium process per session
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> ExtractionResult<CdpBrowserConfig> {
        let settings = &self.config;
        let mut builder = CdpBrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .launch_timeout(Duration::from_millis(settings.launch_timeout_ms))
            .arg(format!("--lang={}", settings.locale))
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        if let Some(user_agent) = &settings.user_agent {
            builder = builder.arg(format!("--user-agent={user_agent}"));
        }

        builder
            .build()
            .map_err(|e| ExtractionError::session_fault(format!("invalid browser config: {e}")))
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Driver = ChromeSession;

    async fn launch(&self) -> ExtractionResult<Self::Driver> {
        let config = self.build_config()?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(map_cdp_error)?;

        // The handler must be polled for the connection to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(map_cdp_error(e));
            }
        };

        debug!("🚀 Browser session launched (headless: {})", self.config.headless);
        Ok(ChromeSession {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_with_explicit_executable() {
        let launcher = ChromeLauncher::new(BrowserConfig {
            executable: Some("/usr/bin/chromium".into()),
            user_agent: Some("Mozilla/5.0".into()),
            ..Default::default()
        });
        assert!(launcher.build_config().is_ok());
    }

    #[test]
    fn test_connection_errors_are_faults() {
        let io = CdpError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"));
        assert!(is_session_fault(&io));
        assert!(!is_session_fault(&CdpError::NotFound));
        assert_eq!(map_cdp_error(io).kind(), "session_fault");
    }
}
