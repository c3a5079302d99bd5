//! Browser automation using Chromium over the DevTools protocol.
//!
//! The scrape stage only sees the [`BrowserLauncher`] / [`BrowserSession`]
//! traits. [`ChromeLauncher`] is the production implementation: a headless
//! Chromium with a desktop user agent, a fixed window and the usual automation
//! markers removed.

use crate::error::{DigestError, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// User agent string presented to publisher sites
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Hides `navigator.webdriver` before any page script runs
const HIDE_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

/// How often `wait_for` re-checks the DOM
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One live browser tab
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and wait for the load to finish
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Wait until an element matching `selector` exists, or fail with [`DigestError::Timeout`]
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Rendered HTML of the current page
    async fn html(&mut self) -> Result<String>;

    /// Title of the current page (empty if it has none)
    async fn title(&mut self) -> Result<String>;

    /// Tear down the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for fresh browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// Launch options for [`ChromeLauncher`]
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Explicit Chrome/Chromium binary; autodetected when `None`
    pub executable: Option<PathBuf>,
    /// Window size in pixels
    pub window: (u32, u32),
    /// User agent override
    pub user_agent: String,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: std::env::var_os("CHROME_BIN").map(PathBuf::from),
            window: (1920, 1080),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl BrowserOptions {
    /// Command-line switches passed to Chromium.
    ///
    /// Chromium's default switch set is replaced so that `--enable-automation`
    /// is never passed.
    fn args(&self) -> Vec<String> {
        vec![
            format!("--user-agent={}", self.user_agent),
            format!("--window-size={},{}", self.window.0, self.window.1),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--disable-infobars".to_string(),
            "--disable-extensions".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-background-timer-throttling".to_string(),
            "--disable-backgrounding-occluded-windows".to_string(),
            "--disable-breakpad".to_string(),
            "--disable-default-apps".to_string(),
            "--disable-popup-blocking".to_string(),
            "--disable-sync".to_string(),
            "--metrics-recording-only".to_string(),
            "--no-first-run".to_string(),
            "--password-store=basic".to_string(),
            "--use-mock-keychain".to_string(),
        ]
    }
}

/// Launches a dedicated Chromium process per session
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    options: BrowserOptions,
}

impl ChromeLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let opts = &self.options;

        let mut builder = BrowserConfig::builder()
            .disable_default_args()
            .no_sandbox()
            .window_size(opts.window.0, opts.window.1)
            .viewport(None)
            .args(opts.args());
        if !opts.headless {
            builder = builder.with_head();
        }
        if let Some(ref bin) = opts.executable {
            builder = builder.chrome_executable(bin);
        }
        let config = builder
            .build()
            .map_err(|e| DigestError::Config(format!("Invalid browser config: {}", e)))?;

        info!(headless = opts.headless, executable = ?opts.executable, "Launching Chromium");

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DigestError::Browser(format!("Failed to launch browser: {}", e)))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match open_stealth_page(&browser, &opts.user_agent).await {
            Ok(page) => page,
            Err(e) => {
                let mut session = ChromeSession {
                    browser: Some(browser),
                    page: None,
                    handler_task,
                };
                session.close().await.ok();
                return Err(e);
            }
        };

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            page: Some(page),
            handler_task,
        }))
    }
}

/// Network-level user agent override applied to every new page
fn user_agent_override(user_agent: &str) -> SetUserAgentOverrideParams {
    SetUserAgentOverrideParams::new(user_agent)
}

async fn open_stealth_page(browser: &Browser, user_agent: &str) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| DigestError::Browser(format!("Failed to create page: {}", e)))?;

    page.set_user_agent(user_agent_override(user_agent))
        .await
        .map_err(|e| DigestError::Browser(format!("Failed to set user agent: {}", e)))?;

    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(HIDE_WEBDRIVER_JS))
        .await
        .map_err(|e| DigestError::Browser(format!("Failed to install init script: {}", e)))?;

    Ok(page)
}

/// A Chromium process with one tab
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
}

impl ChromeSession {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| DigestError::Browser("Session already closed".to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        debug!(url = url, "Navigating");
        self.page()?
            .goto(url)
            .await
            .map_err(|e| DigestError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        let poll = async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| DigestError::Timeout {
                selector: selector.to_string(),
                waited: timeout,
            })
    }

    async fn html(&mut self) -> Result<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| DigestError::Browser(format!("Failed to read page content: {}", e)))
    }

    async fn title(&mut self) -> Result<String> {
        let title = self
            .page()?
            .get_title()
            .await
            .map_err(|e| DigestError::Browser(format!("Failed to read page title: {}", e)))?;
        Ok(title.unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        self.page = None;
        let result = match self.browser.take() {
            Some(mut browser) => {
                let closed = browser
                    .close()
                    .await
                    .map(|_| ())
                    .map_err(|e| DigestError::Browser(format!("Failed to close browser: {}", e)));
                if let Err(e) = browser.wait().await {
                    warn!(error = %e, "Browser process did not exit cleanly");
                }
                closed
            }
            None => Ok(()),
        };
        self.handler_task.abort();
        result
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
