//! Runtime configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file
//! (`--config`), then command-line flags / environment variables from
//! [`crate::cli::Cli`]. The result is validated once at startup and shared
//! read-only for the life of the process.

use crate::cli::Cli;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// Browser user agents rotated per request to avoid trivial bot blocking.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Linux; Android 14; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
];

/// Origins of the Vite/CRA dev servers the front end runs on.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("LLM API key is not set (use --llm-api-key or LLM_API_KEY)")]
    MissingApiKey,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub fetch: FetchSettings,
    pub extract: ExtractSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_ms: u64,
    pub max_redirects: usize,
    pub user_agents: Vec<String>,
    /// Hosts that may be fetched (subdomains included). Empty means any host.
    pub allowed_domains: Vec<String>,
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_redirects: 5,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            allowed_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// Prefix cut applied to the body text; `None` disables truncation.
    pub max_content_chars: Option<usize>,
    /// Take the first body candidate longer than this instead of the longest.
    pub early_exit_chars: Option<usize>,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            max_content_chars: Some(8000),
            early_exit_chars: None,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            timeout_ms: 60_000,
            temperature: 0.2,
            max_tokens: 1500,
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("timeout_ms", &self.timeout_ms)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Settings {
    /// Parse settings from YAML. Missing sections and keys take defaults.
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }

    /// Read and parse a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let display = path.as_ref().display().to_string();
        let yaml = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let settings = Self::from_yaml(&yaml, &display)?;
        info!("Loaded configuration file");
        Ok(settings)
    }

    /// Build the effective settings for this process: file (if any), then
    /// CLI/env overrides, then validation.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay every option the user set on the command line or in the
    /// environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if !cli.allowed_origins.is_empty() {
            self.server.allowed_origins = cli.allowed_origins.clone();
        }
        if let Some(timeout_ms) = cli.fetch_timeout_ms {
            self.fetch.timeout_ms = timeout_ms;
        }
        if !cli.allowed_domains.is_empty() {
            self.fetch.allowed_domains = cli.allowed_domains.clone();
        }
        if let Some(max) = cli.max_content_chars {
            self.extract.max_content_chars = (max > 0).then_some(max);
        }
        if let Some(key) = &cli.llm_api_key {
            self.llm.api_key = key.clone();
        }
        if let Some(base_url) = &cli.llm_base_url {
            self.llm.base_url = base_url.clone();
        }
        if let Some(model) = &cli.llm_model {
            self.llm.model = model.clone();
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        for origin in &self.server.allowed_origins {
            match Url::parse(origin) {
                Ok(u) if matches!(u.scheme(), "http" | "https") => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "allowed origin `{origin}` is not an http(s) URL"
                    )));
                }
            }
        }
        if !(100..=120_000).contains(&self.fetch.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "fetch.timeout_ms must be between 100 and 120000, got {}",
                self.fetch.timeout_ms
            )));
        }
        if self.fetch.max_redirects > 10 {
            return Err(ConfigError::Invalid(format!(
                "fetch.max_redirects must be at most 10, got {}",
                self.fetch.max_redirects
            )));
        }
        if self.fetch.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "fetch.user_agents must contain at least one user agent".into(),
            ));
        }
        if self.llm.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if Url::parse(&self.llm.base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "llm.base_url `{}` is not a valid URL",
                self.llm.base_url
            )));
        }
        if self.llm.timeout_ms == 0 {
            return Err(ConfigError::Invalid("llm.timeout_ms must be non-zero".into()));
        }
        Ok(())
    }
}
