//! Command-line interface definitions for the news bias analyzer.
//!
//! Every option can also be supplied through the environment variable named
//! in its `env` attribute. Values given here override the YAML config file.

use clap::Parser;

/// Command-line arguments for the news bias analyzer server.
///
/// # Examples
///
/// ```sh
/// # Minimal: key from the environment, everything else defaulted
/// LLM_API_KEY=sk-... news_bias_analyzer
///
/// # Restrict scraping to a few outlets and use a config file for the rest
/// news_bias_analyzer -c config.yaml --allowed-domains prothomalo.com,thedailystar.net
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long, env = "CONFIG_PATH")]
    pub config: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Browser origins allowed by CORS (comma separated)
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Timeout for fetching an article, in milliseconds
    #[arg(long, env = "FETCH_TIMEOUT_MS")]
    pub fetch_timeout_ms: Option<u64>,

    /// Only fetch from these domains and their subdomains (comma separated)
    #[arg(long, env = "ALLOWED_DOMAINS", value_delimiter = ',')]
    pub allowed_domains: Vec<String>,

    /// Maximum characters of article text to keep (0 disables the cap)
    #[arg(long, env = "MAX_CONTENT_CHARS")]
    pub max_content_chars: Option<usize>,

    /// API key for the LLM provider
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// Model name to request
    #[arg(long, env = "LLM_MODEL")]
    pub llm_model: Option<String>,
}
