// src/profile_analysis/mod.rs
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

pub mod browser;
pub mod extractor;
pub mod fetcher;
pub mod llm_client;
pub mod prompt;
pub mod types;
pub mod validator;

pub use browser::ChromeDriver;
pub use fetcher::{BrowserDriver, BrowserSession, FetchPolicy, ProfileFetcher, WaitUntil};
pub use llm_client::{CompletionProvider, LlmClient};
pub use types::*;

use crate::core::ConfigManager;
use crate::error::Result;

/// Fetch → extract → summarize → analyze, one sequential pass per request
pub struct ProfileAnalyzer {
    fetcher: ProfileFetcher,
    completion: Arc<dyn CompletionProvider>,
}

impl ProfileAnalyzer {
    pub fn new(fetcher: ProfileFetcher, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            fetcher,
            completion,
        }
    }

    /// Production wiring: headless Chrome plus the configured chat model
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        let driver = Arc::new(ChromeDriver::new(config.browser.clone()));
        let completion = Arc::new(LlmClient::new(config.llm.clone())?);
        Ok(Self::new(ProfileFetcher::new(driver), completion))
    }

    pub async fn analyze_profile(&self, profile_url: &str) -> Result<AnalysisResult> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("analyze_profile", %request_id);
        self.run(profile_url).instrument(span).await
    }

    async fn run(&self, profile_url: &str) -> Result<AnalysisResult> {
        let started = Instant::now();
        info!("Starting profile analysis for {}", profile_url);

        self.completion.ensure_configured()?;
        let html = self.fetcher.fetch(profile_url).await?;

        let record = extractor::extract_profile(&html)?;
        info!(
            "Extracted profile: {} ({})",
            record.basic_info.name, record.basic_info.title
        );

        let prompt = prompt::build_prompt(&record)?;
        let raw = self
            .completion
            .complete(prompt::SYSTEM_INSTRUCTION, &prompt)
            .await?;

        let parsed = validator::parse_model_response(&raw)?;
        let result = validator::normalize_analysis(&parsed, &record)?;

        info!(
            "Profile analysis completed in {:.1}s (overall score {})",
            started.elapsed().as_secs_f64(),
            result.profile_overview.overall_score
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_manager::LlmConfig;
    use crate::error::AnalysisError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingDriver {
        launches: AtomicU32,
    }

    #[async_trait]
    impl BrowserDriver for CountingDriver {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Err(AnalysisError::BrowserError("no browser in tests".to_string()))
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_browser_launch() {
        let driver = Arc::new(CountingDriver::default());
        let completion = LlmClient::new(LlmConfig {
            api_key: None,
            ..LlmConfig::default()
        })
        .unwrap();
        let analyzer = ProfileAnalyzer::new(
            ProfileFetcher::new(driver.clone()),
            Arc::new(completion),
        );

        let result = analyzer
            .analyze_profile("https://www.upwork.com/freelancers/~01")
            .await;

        assert!(matches!(result, Err(AnalysisError::ConfigurationError(_))));
        assert_eq!(driver.launches.load(Ordering::SeqCst), 0);
    }
}
