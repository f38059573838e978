// src/profile_analysis/browser.rs
//! Chrome DevTools implementation of the browser driver.

use super::fetcher::{BrowserDriver, BrowserSession, WaitUntil};
use crate::core::config_manager::BrowserConfig;
use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Resource kinds allowed through; everything else is aborted
const ALLOWED_RESOURCES: [ResourceType; 4] = [
    ResourceType::Document,
    ResourceType::Script,
    ResourceType::Xhr,
    ResourceType::Fetch,
];

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);
const SCROLL_TIMEOUT: Duration = Duration::from_secs(30);

const AUTO_SCROLL_JS: &str = r#"async () => {
    await new Promise((resolve) => {
        let scrolled = 0;
        const step = 100;
        const timer = setInterval(() => {
            window.scrollBy(0, step);
            scrolled += step;
            if (scrolled >= document.body.scrollHeight) {
                clearInterval(timer);
                resolve();
            }
        }, 100);
    });
}"#;

const NETWORK_STATE_JS: &str =
    "[document.readyState, performance.getEntriesByType('resource').length]";
/// Stamps the current window before a fallback navigation; the stamp is gone
/// once the new document commits.
const MARK_STALE_DOCUMENT_JS: &str = "window.__profileAnalyzerStaleDocument = true";
const DOM_READY_JS: &str =
    "window.__profileAnalyzerStaleDocument !== true && document.readyState !== 'loading'";
const RESPONSE_STATUS_JS: &str =
    "(performance.getEntriesByType('navigation')[0] || {}).responseStatus || 0";

pub struct ChromeDriver {
    config: BrowserConfig,
}

impl ChromeDriver {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn chrome_config(&self) -> Result<ChromeConfig> {
        let mut builder = ChromeConfig::builder()
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .viewport(Viewport {
                width: self.config.viewport_width,
                height: self.config.viewport_height,
                ..Viewport::default()
            })
            .arg(format!("--user-agent={}", self.config.user_agent));

        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if self.config.no_sandbox {
            builder = builder.no_sandbox();
        }

        builder.build().map_err(AnalysisError::BrowserError)
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let (mut browser, mut handler) = Browser::launch(self.chrome_config()?)
            .await
            .map_err(browser_error)?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        match open_page(&browser).await {
            Ok((page, interceptor)) => Ok(Box::new(ChromeSession {
                browser,
                page,
                handler_task,
                interceptor,
            })),
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Failed to close browser after page setup error: {}", close_err);
                }
                handler_task.abort();
                Err(e)
            }
        }
    }
}

async fn open_page(browser: &Browser) -> Result<(Page, JoinHandle<()>)> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(browser_error)?;
    let interceptor = intercept_requests(page.clone()).await?;
    Ok((page, interceptor))
}

/// Pause every request and only let document, script, xhr and fetch through
async fn intercept_requests(page: Page) -> Result<JoinHandle<()>> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(browser_error)?;

    page.execute(
        EnableParams::builder()
            .pattern(
                RequestPattern::builder()
                    .url_pattern("*")
                    .request_stage(RequestStage::Request)
                    .build(),
            )
            .build(),
    )
    .await
    .map_err(browser_error)?;

    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let outcome = if ALLOWED_RESOURCES.contains(&event.resource_type) {
                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            } else {
                page.execute(FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                ))
                .await
                .map(|_| ())
            };

            if let Err(e) = outcome {
                debug!("Request interception failed: {}", e);
            }
        }
    }))
}

struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    interceptor: JoinHandle<()>,
}

impl ChromeSession {
    async fn eval<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        self.page
            .evaluate(expression)
            .await
            .map_err(browser_error)?
            .into_value()
            .map_err(|e| AnalysisError::BrowserError(format!("unexpected script result: {}", e)))
    }

    /// Resolves once the document is complete and no new resources have
    /// started for [`NETWORK_IDLE_WINDOW`]
    async fn wait_for_network_idle(&self) -> Result<()> {
        let mut last_count = -1;
        let mut stable_since = Instant::now();

        loop {
            let (ready_state, count): (String, i64) = self.eval(NETWORK_STATE_JS).await?;

            if ready_state == "complete" && count == last_count {
                if stable_since.elapsed() >= NETWORK_IDLE_WINDOW {
                    return Ok(());
                }
            } else {
                last_count = count;
                stable_since = Instant::now();
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_dom_ready(&self) -> Result<()> {
        while !self.eval::<bool>(DOM_READY_JS).await? {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn response_status(&self) -> Option<u16> {
        match self.eval::<u16>(RESPONSE_STATUS_JS).await {
            Ok(0) => None,
            Ok(status) => Some(status),
            Err(e) => {
                debug!("Could not read navigation status: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<Option<u16>> {
        let navigation = async {
            match wait {
                WaitUntil::NetworkIdle => {
                    self.page.goto(url).await.map_err(browser_error)?;
                    self.wait_for_network_idle().await?;
                }
                WaitUntil::DomContentLoaded => {
                    if let Err(e) = self.eval::<bool>(MARK_STALE_DOCUMENT_JS).await {
                        debug!("Could not mark previous document: {}", e);
                    }
                    self.page
                        .execute(NavigateParams::new(url))
                        .await
                        .map_err(browser_error)?;
                    self.wait_for_dom_ready().await?;
                }
            }
            Ok::<_, AnalysisError>(self.response_status().await)
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| {
                AnalysisError::Timeout(format!(
                    "navigation ({:?}) exceeded {}s",
                    wait,
                    timeout.as_secs()
                ))
            })?
    }

    async fn wait_for_any(&mut self, selectors: &[&str], timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;

        loop {
            for selector in selectors {
                if self.page.find_element(*selector).await.is_ok() {
                    debug!("Content marker found: {}", selector);
                    return Ok(true);
                }
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn auto_scroll(&mut self) -> Result<()> {
        tokio::time::timeout(SCROLL_TIMEOUT, self.page.evaluate_function(AUTO_SCROLL_JS))
            .await
            .map_err(|_| AnalysisError::Timeout("auto-scroll did not finish".to_string()))?
            .map_err(browser_error)?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.page.content().await.map_err(browser_error)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromeSession {
            mut browser,
            page,
            handler_task,
            interceptor,
        } = *self;

        interceptor.abort();
        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        let closed = browser.close().await.map_err(browser_error);
        if let Err(e) = browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }
        handler_task.abort();

        closed.map(|_| ())
    }
}

fn browser_error(err: CdpError) -> AnalysisError {
    AnalysisError::BrowserError(err.to_string())
}
