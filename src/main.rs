//! # News Bias Analyzer
//!
//! A small HTTP backend that downloads a news article, extracts its readable
//! text with generic selectors, and asks an OpenAI-compatible LLM for a
//! bias, clickbait and misinformation verdict.
//!
//! ## Usage
//!
//! ```sh
//! LLM_API_KEY=sk-... news_bias_analyzer --port 3001 --allowed-domains prothomalo.com,thedailystar.net
//! ```
//!
//! ## Architecture
//!
//! Every request runs a short pipeline:
//! 1. **Fetching**: download the page with a rotating browser user agent
//! 2. **Extracting**: strip page chrome and pick the longest article body
//! 3. **Analyzing** (`/api/analyze` only): send the text to the LLM and parse
//!    its JSON verdict
//!
//! Failures surface as `{"error": <kind>, "message": ...}` with a status
//! matching the kind.

use clap::Parser;
use std::error::Error;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod scrapers;
mod server;
mod utils;

use api::ChatClient;
use cli::Cli;
use config::Settings;
use scrapers::extract::Extractor;
use scrapers::fetch::Fetcher;
use server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    let settings = Settings::load(&args)?;
    debug!(?settings, "Loaded settings");

    let fetcher = Fetcher::new(&settings.fetch)?;
    let extractor = Extractor::new(&settings.extract);
    let analyzer = ChatClient::new(&settings.llm)?;
    let cors = server::build_cors(&settings.server.allowed_origins)?;
    let app = server::router(AppState::new(fetcher, extractor, analyzer), cors);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        %addr,
        model = %settings.llm.model,
        allowed_domains = settings.fetch.allowed_domains.len(),
        "news_bias_analyzer listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C; shutting down");
        return;
    }
    info!("Ctrl-C received, draining connections");
}
