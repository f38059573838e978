// src/core/config_manager.rs
//! Unified configuration: defaults, then `config.yaml`, then environment

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    pub no_sandbox: bool,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            no_sandbox: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvironmentSection {
    server: Option<ServerConfig>,
    browser: Option<BrowserConfig>,
    llm: Option<LlmConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    local: EnvironmentSection,
    production: EnvironmentSection,
}

impl ConfigManager {
    /// Load configuration for the current `ENVIRONMENT`
    pub fn load() -> Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        info!("Loading configuration for environment: {}", environment);

        Self::load_from(Path::new(CONFIG_FILE), &environment, |key| {
            std::env::var(key).ok()
        })
    }

    pub fn load_from<F>(config_path: &Path, environment: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            config.merge_file(&content, environment)?;
            info!("Applied configuration file: {}", config_path.display());
        }

        config.apply_env(env)?;
        Ok(config)
    }

    fn merge_file(&mut self, content: &str, environment: &str) -> Result<()> {
        let file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse configuration file")?;

        let section = match environment {
            "production" => file.production,
            _ => file.local,
        };

        if let Some(server) = section.server {
            self.server = server;
        }
        if let Some(browser) = section.browser {
            self.browser = browser;
        }
        if let Some(llm) = section.llm {
            self.llm = llm;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = env("PORT").or_else(|| env("ROCKET_PORT")) {
            self.server.port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got '{}'", port))?;
        }
        if let Some(address) = env("BIND_ADDRESS") {
            self.server.address = address;
        }

        if let Some(path) = env("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(flag) = env("BROWSER_NO_SANDBOX") {
            self.browser.no_sandbox = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        self.llm.api_key = env("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        if let Some(url) = env("LLM_API_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = env("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(timeout) = env("LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = timeout
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a number of seconds")?;
        }

        Ok(())
    }
}
