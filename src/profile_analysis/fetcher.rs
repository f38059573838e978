// src/profile_analysis/fetcher.rs
//! Loads a profile page in a headless browser and returns the rendered HTML.

use super::extractor::CONTENT_MARKERS;
use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub const TARGET_DOMAIN: &str = "upwork.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait until the page stops issuing requests
    NetworkIdle,
    /// Wait only for the DOM to be parsed
    DomContentLoaded,
}

/// Launches isolated browser sessions
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One browser instance with a single page
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and return the main document's HTTP status when known.
    /// Exceeding `timeout` must yield [`AnalysisError::Timeout`].
    async fn navigate(&mut self, url: &str, wait: WaitUntil, timeout: Duration)
        -> Result<Option<u16>>;

    /// Poll until any of `selectors` matches, `false` once `timeout` elapses
    async fn wait_for_any(&mut self, selectors: &[&str], timeout: Duration) -> Result<bool>;

    async fn auto_scroll(&mut self) -> Result<()>;

    async fn content(&mut self) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Retry counts and timeouts of a fetch
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub launch_attempts: u32,
    pub launch_delay: Duration,
    pub navigation_timeout: Duration,
    pub fallback_timeout: Duration,
    pub selector_attempts: u32,
    pub selector_timeout: Duration,
    pub selector_delay: Duration,
    pub min_html_len: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            launch_attempts: 3,
            launch_delay: Duration::from_secs(1),
            navigation_timeout: Duration::from_secs(60),
            fallback_timeout: Duration::from_secs(30),
            selector_attempts: 3,
            selector_timeout: Duration::from_secs(10),
            selector_delay: Duration::from_secs(2),
            min_html_len: 1000,
        }
    }
}

pub struct ProfileFetcher {
    driver: Arc<dyn BrowserDriver>,
    policy: FetchPolicy,
}

impl ProfileFetcher {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            policy: FetchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch the rendered HTML of a profile page.
    ///
    /// The browser session is closed on every path once it has been launched.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let url = validate_profile_url(url)?;
        info!("Fetching profile page: {}", url);

        let mut session = self.launch_with_retry().await?;
        let result = self.load_page(session.as_mut(), url.as_str()).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        let html = result?;
        info!("Fetched {} chars of rendered HTML", html.len());
        Ok(html)
    }

    async fn launch_with_retry(&self) -> Result<Box<dyn BrowserSession>> {
        let attempts = self.policy.launch_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.driver.launch().await {
                Ok(session) => return Ok(session),
                Err(e) => {
                    warn!("Browser launch attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.launch_delay).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AnalysisError::BrowserError("browser did not start".to_string())))
    }

    async fn load_page(&self, session: &mut dyn BrowserSession, url: &str) -> Result<String> {
        let status = match session
            .navigate(url, WaitUntil::NetworkIdle, self.policy.navigation_timeout)
            .await
        {
            Err(AnalysisError::Timeout(reason)) => {
                warn!("Navigation timed out ({}), retrying with DOM content loaded", reason);
                session
                    .navigate(url, WaitUntil::DomContentLoaded, self.policy.fallback_timeout)
                    .await?
            }
            other => other?,
        };

        if let Some(status) = status.filter(|status| *status >= 400) {
            return Err(AnalysisError::UpstreamUnavailable(format!(
                "profile page returned HTTP {}",
                status
            )));
        }

        self.wait_for_content(session).await?;

        if let Err(e) = session.auto_scroll().await {
            warn!("Auto-scroll failed, continuing with current content: {}", e);
        }

        let html = session.content().await?;
        let length = html.chars().count();
        if length < self.policy.min_html_len {
            return Err(AnalysisError::MalformedResponse(format!(
                "page content too short: {} chars (minimum {})",
                length, self.policy.min_html_len
            )));
        }

        Ok(html)
    }

    async fn wait_for_content(&self, session: &mut dyn BrowserSession) -> Result<()> {
        let attempts = self.policy.selector_attempts.max(1);

        for attempt in 1..=attempts {
            match session
                .wait_for_any(&CONTENT_MARKERS, self.policy.selector_timeout)
                .await
            {
                Ok(true) => return Ok(()),
                Ok(false) => warn!(
                    "Profile content not rendered yet (attempt {}/{})",
                    attempt, attempts
                ),
                Err(e) => warn!(
                    "Content check failed (attempt {}/{}): {}",
                    attempt, attempts, e
                ),
            }

            if attempt < attempts {
                tokio::time::sleep(self.policy.selector_delay).await;
            }
        }

        Err(AnalysisError::ContentNotFound(format!(
            "none of {:?} appeared after {} attempts",
            CONTENT_MARKERS, attempts
        )))
    }
}

/// Accept only http(s) URLs on the marketplace domain
pub fn validate_profile_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Profile URL is required".to_string(),
        ));
    }

    let url = Url::parse(raw)
        .map_err(|_| AnalysisError::InvalidInput("Profile URL is not a valid URL".to_string()))?;

    let on_domain = url.host_str().is_some_and(|host| {
        let host = host.to_lowercase();
        host == TARGET_DOMAIN || host.ends_with(&format!(".{}", TARGET_DOMAIN))
    });

    if !matches!(url.scheme(), "http" | "https") || !on_domain {
        return Err(AnalysisError::InvalidInput(format!(
            "Profile URL must be a {} profile link",
            TARGET_DOMAIN
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Script {
        launch_failures: u32,
        navigations: VecDeque<Result<Option<u16>>>,
        markers_found: bool,
        scroll_fails: bool,
        html: String,
    }

    #[derive(Default)]
    struct Calls {
        launches: u32,
        closes: u32,
        waits: Vec<WaitUntil>,
        marker_checks: u32,
        scrolls: u32,
    }

    #[derive(Clone, Default)]
    struct FakeDriver {
        script: Arc<Mutex<Script>>,
        calls: Arc<Mutex<Calls>>,
    }

    struct FakeSession {
        driver: FakeDriver,
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            self.calls.lock().unwrap().launches += 1;
            let mut script = self.script.lock().unwrap();
            if script.launch_failures > 0 {
                script.launch_failures -= 1;
                return Err(AnalysisError::BrowserError("chrome crashed".to_string()));
            }
            Ok(Box::new(FakeSession {
                driver: self.clone(),
            }))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn navigate(
            &mut self,
            _url: &str,
            wait: WaitUntil,
            _timeout: Duration,
        ) -> Result<Option<u16>> {
            self.driver.calls.lock().unwrap().waits.push(wait);
            self.driver
                .script
                .lock()
                .unwrap()
                .navigations
                .pop_front()
                .unwrap_or(Ok(Some(200)))
        }

        async fn wait_for_any(&mut self, _selectors: &[&str], _timeout: Duration) -> Result<bool> {
            self.driver.calls.lock().unwrap().marker_checks += 1;
            Ok(self.driver.script.lock().unwrap().markers_found)
        }

        async fn auto_scroll(&mut self) -> Result<()> {
            self.driver.calls.lock().unwrap().scrolls += 1;
            if self.driver.script.lock().unwrap().scroll_fails {
                return Err(AnalysisError::Timeout("auto-scroll did not finish".to_string()));
            }
            Ok(())
        }

        async fn content(&mut self) -> Result<String> {
            Ok(self.driver.script.lock().unwrap().html.clone())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.driver.calls.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    const PROFILE_URL: &str = "https://www.upwork.com/freelancers/~01abcdef";

    fn driver(script: Script) -> FakeDriver {
        FakeDriver {
            script: Arc::new(Mutex::new(script)),
            calls: Arc::default(),
        }
    }

    fn fetcher(driver: &FakeDriver) -> ProfileFetcher {
        ProfileFetcher::new(Arc::new(driver.clone())).with_policy(FetchPolicy {
            launch_delay: Duration::ZERO,
            selector_delay: Duration::ZERO,
            ..FetchPolicy::default()
        })
    }

    fn rendered_page() -> Script {
        Script {
            markers_found: true,
            html: include_str!("../../tests/fixtures/profile.html").to_string(),
            ..Script::default()
        }
    }

    #[test]
    fn test_validate_profile_url() {
        assert!(validate_profile_url(PROFILE_URL).is_ok());
        assert!(validate_profile_url("https://upwork.com/freelancers/~01").is_ok());
        assert!(validate_profile_url("").is_err());
        assert!(validate_profile_url("   ").is_err());
        assert!(validate_profile_url("not a url").is_err());
        assert!(validate_profile_url("https://www.fiverr.com/jane").is_err());
        assert!(validate_profile_url("https://upwork.com.evil.io/freelancers/~01").is_err());
        assert!(validate_profile_url("ftp://www.upwork.com/freelancers/~01").is_err());
    }

    #[tokio::test]
    async fn test_off_domain_url_never_launches_browser() {
        let driver = driver(rendered_page());
        let result = fetcher(&driver).fetch("https://example.com/profile").await;

        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
        assert_eq!(driver.calls.lock().unwrap().launches, 0);
    }

    #[tokio::test]
    async fn test_fetch_success_closes_browser() {
        let driver = driver(rendered_page());
        let html = fetcher(&driver).fetch(PROFILE_URL).await.unwrap();

        assert!(html.contains("Jane"));
        let calls = driver.calls.lock().unwrap();
        assert_eq!(calls.launches, 1);
        assert_eq!(calls.closes, 1);
        assert_eq!(calls.scrolls, 1);
        assert_eq!(calls.waits, vec![WaitUntil::NetworkIdle]);
    }

    #[tokio::test]
    async fn test_launch_is_retried() {
        let driver = driver(Script {
            launch_failures: 2,
            ..rendered_page()
        });
        assert!(fetcher(&driver).fetch(PROFILE_URL).await.is_ok());
        assert_eq!(driver.calls.lock().unwrap().launches, 3);
    }

    #[tokio::test]
    async fn test_launch_gives_up_after_three_attempts() {
        let driver = driver(Script {
            launch_failures: 5,
            ..rendered_page()
        });
        let result = fetcher(&driver).fetch(PROFILE_URL).await;

        assert!(matches!(result, Err(AnalysisError::BrowserError(_))));
        let calls = driver.calls.lock().unwrap();
        assert_eq!(calls.launches, 3);
        assert_eq!(calls.closes, 0);
    }

    #[tokio::test]
    async fn test_navigation_timeout_falls_back_once() {
        let driver = driver(Script {
            navigations: VecDeque::from(vec![
                Err(AnalysisError::Timeout("network idle".to_string())),
                Ok(Some(200)),
            ]),
            ..rendered_page()
        });
        assert!(fetcher(&driver).fetch(PROFILE_URL).await.is_ok());
        assert_eq!(
            driver.calls.lock().unwrap().waits,
            vec![WaitUntil::NetworkIdle, WaitUntil::DomContentLoaded]
        );
    }

    #[tokio::test]
    async fn test_second_timeout_surfaces_and_closes() {
        let driver = driver(Script {
            navigations: VecDeque::from(vec![
                Err(AnalysisError::Timeout("network idle".to_string())),
                Err(AnalysisError::Timeout("dom content loaded".to_string())),
            ]),
            ..rendered_page()
        });
        let result = fetcher(&driver).fetch(PROFILE_URL).await;

        assert!(result.as_ref().is_err_and(|e| e.is_timeout()));
        assert_eq!(driver.calls.lock().unwrap().closes, 1);
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_unavailable() {
        let driver = driver(Script {
            navigations: VecDeque::from(vec![Ok(Some(404))]),
            ..rendered_page()
        });
        let result = fetcher(&driver).fetch(PROFILE_URL).await;

        assert!(matches!(result, Err(AnalysisError::UpstreamUnavailable(_))));
        let calls = driver.calls.lock().unwrap();
        assert_eq!(calls.closes, 1);
        assert_eq!(calls.marker_checks, 0);
    }

    #[tokio::test]
    async fn test_missing_markers_after_three_attempts() {
        let driver = driver(Script {
            markers_found: false,
            ..rendered_page()
        });
        let result = fetcher(&driver).fetch(PROFILE_URL).await;

        assert!(matches!(result, Err(AnalysisError::ContentNotFound(_))));
        let calls = driver.calls.lock().unwrap();
        assert_eq!(calls.marker_checks, 3);
        assert_eq!(calls.closes, 1);
    }

    #[tokio::test]
    async fn test_short_html_is_malformed_even_with_markers() {
        let driver = driver(Script {
            html: "<html><body><h1 itemprop=\"name\">Jane</h1></body></html>".to_string(),
            ..rendered_page()
        });
        let result = fetcher(&driver).fetch(PROFILE_URL).await;

        assert!(matches!(result, Err(AnalysisError::MalformedResponse(_))));
        assert_eq!(driver.calls.lock().unwrap().closes, 1);
    }

    #[tokio::test]
    async fn test_multibyte_page_length_counts_characters() {
        let html = format!(
            "<html><body><h1 itemprop=\"name\">Jane</h1><p>{}</p></body></html>",
            "é".repeat(600)
        );
        assert!(html.len() >= 1000);

        let driver = driver(Script {
            html,
            ..rendered_page()
        });
        let result = fetcher(&driver).fetch(PROFILE_URL).await;

        assert!(matches!(result, Err(AnalysisError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_scroll_failure_still_returns_html() {
        let driver = driver(Script {
            scroll_fails: true,
            ..rendered_page()
        });
        let html = fetcher(&driver).fetch(PROFILE_URL).await.unwrap();

        assert!(html.contains("Jane"));
        let calls = driver.calls.lock().unwrap();
        assert_eq!(calls.scrolls, 1);
        assert_eq!(calls.closes, 1);
    }

    #[tokio::test]
    async fn test_non_timeout_navigation_error_skips_fallback() {
        let driver = driver(Script {
            navigations: VecDeque::from(vec![Err(AnalysisError::BrowserError(
                "net::ERR_NAME_NOT_RESOLVED".to_string(),
            ))]),
            ..rendered_page()
        });
        let result = fetcher(&driver).fetch(PROFILE_URL).await;

        assert!(matches!(result, Err(AnalysisError::BrowserError(_))));
        let calls = driver.calls.lock().unwrap();
        assert_eq!(calls.waits, vec![WaitUntil::NetworkIdle]);
        assert_eq!(calls.marker_checks, 0);
        assert_eq!(calls.closes, 1);
    }
}
