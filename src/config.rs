//! Service configuration
//!
//! Built once at startup (defaults, then `.env` / process environment, then
//! CLI overrides applied by the binary) and passed into the service.

use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

/// Chat-completion endpoint settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory searched for the `*sales*.csv` file
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = AppConfig::default();

        if let Some(dir) = non_empty("SALES_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = non_empty("SALES_HOST") {
            config.host = host;
        }
        if let Some(port) = non_empty("SALES_PORT").and_then(|p| p.trim().parse().ok()) {
            config.port = port;
        }

        config.llm.api_key = non_empty("OPENAI_API_KEY");
        if let Some(model) = non_empty("OPENAI_MODEL") {
            config.llm.model = model;
        }
        if let Some(base_url) = non_empty("OPENAI_BASE_URL") {
            config.llm.base_url = base_url.trim_end_matches('/').to_string();
        }

        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
