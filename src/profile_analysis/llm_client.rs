// src/profile_analysis/llm_client.rs
use crate::core::config_manager::LlmConfig;
use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Text-completion capability the analysis pipeline depends on
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Cheap local check run before any page is fetched
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completion endpoint
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AnalysisError::ConfigurationError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config.api_key.as_deref().ok_or_else(|| {
            AnalysisError::ConfigurationError("OPENAI_API_KEY is not set".to_string())
        })
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    fn ensure_configured(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        info!("Sending analysis request to model {} ({})", self.config.model, url);
        debug!("Prompt size: {} chars", prompt.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Model API error {}: {}", status, error_text);
            return Err(AnalysisError::UpstreamUnavailable(format!(
                "model API returned {}",
                status
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AnalysisError::AnalysisParseFailed(format!("invalid completion envelope: {}", e))
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                AnalysisError::AnalysisParseFailed("model returned no content".to_string())
            })?;

        info!("Received {} chars from model", content.len());
        Ok(content)
    }
}
