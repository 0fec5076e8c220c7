//! Article fetcher.
//!
//! Downloads the raw HTML of a news article with browser-like headers. A
//! single [`reqwest::Client`] is built at startup with the configured timeout
//! and redirect limit and shared by all requests; nothing is cached and
//! nothing is retried.
//!
//! # Error Classification
//!
//! | Condition | Variant |
//! |-----------|---------|
//! | not an absolute `http(s)` URL | [`FetchError::InvalidUrl`] |
//! | host outside the configured allow-list | [`FetchError::DomainNotAllowed`] |
//! | DNS failure / connection refused | [`FetchError::HostUnreachable`] |
//! | deadline exceeded | [`FetchError::Timeout`] |
//! | non-2xx response | [`FetchError::UpstreamHttp`] |
//! | anything else | [`FetchError::Unknown`] |
//!
//! URL and allow-list checks run before any network activity.

use crate::config::{FetchSettings, DEFAULT_USER_AGENTS};
use crate::models::FetchResult;
use rand::rng;
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderValue, USER_AGENT};
use reqwest::{Client, redirect::Policy};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGES: &str = "en-US,en;q=0.7,bn;q=0.5";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("domain `{0}` is not in the list of supported news sites")]
    DomainNotAllowed(String),
    #[error("host unreachable: {0}")]
    HostUnreachable(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("origin responded with HTTP {status}")]
    UpstreamHttp { status: u16 },
    #[error("fetch failed: {0}")]
    Unknown(String),
}

impl FetchError {
    pub(crate) fn invalid(url: &str, reason: impl Into<String>) -> Self {
        FetchError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// HTTP client for article pages.
///
/// Holds only immutable state, so one instance serves every request.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    user_agents: Arc<[String]>,
    allowed_domains: Arc<[String]>,
}

impl Fetcher {
    /// Build a fetcher from validated settings.
    ///
    /// # Arguments
    ///
    /// * `settings` - Timeout, redirect limit, user-agent pool and domain
    ///   allow-list. Blank entries are dropped; domains are lowercased and
    ///   stripped of a leading `www.`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the TLS backend cannot be initialized.
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let timeout = settings.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(settings.max_redirects))
            .build()?;

        let user_agents: Vec<String> = settings
            .user_agents
            .iter()
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty())
            .collect();
        let allowed_domains: Vec<String> = settings
            .allowed_domains
            .iter()
            .map(|d| d.trim().to_ascii_lowercase())
            .map(|d| d.strip_prefix("www.").map(str::to_string).unwrap_or(d))
            .filter(|d| !d.is_empty())
            .collect();

        Ok(Self {
            client,
            timeout,
            user_agents: user_agents.into(),
            allowed_domains: allowed_domains.into(),
        })
    }

    /// Parse and vet a caller-supplied URL without touching the network.
    ///
    /// # Returns
    ///
    /// The parsed URL, or [`FetchError::InvalidUrl`] for empty, relative or
    /// non-`http(s)` input and [`FetchError::DomainNotAllowed`] for a host
    /// outside a non-empty allow-list.
    pub fn validate_url(&self, raw: &str) -> Result<Url, FetchError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FetchError::invalid(raw, "URL is required"));
        }
        let url = Url::parse(raw).map_err(|e| FetchError::invalid(raw, e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::invalid(
                raw,
                format!("unsupported scheme `{}`", url.scheme()),
            ));
        }
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
            _ => return Err(FetchError::invalid(raw, "URL has no host")),
        };
        if !self.is_allowed_host(&host) {
            return Err(FetchError::DomainNotAllowed(host));
        }
        Ok(url)
    }

    fn is_allowed_host(&self, host: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        self.allowed_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{d}")))
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    /// Fetch one page.
    ///
    /// Issues exactly one GET (plus whatever redirects the origin sends, up
    /// to the configured limit). Only 2xx responses produce a
    /// [`FetchResult`].
    ///
    /// # Arguments
    ///
    /// * `raw_url` - Absolute `http`/`https` URL of the article page
    ///
    /// # Returns
    ///
    /// The final URL, response body and content type (`text/html` when the
    /// origin omits the header).
    ///
    /// # Errors
    ///
    /// Every failure is classified into a [`FetchError`] variant; nothing is
    /// retried.
    #[instrument(level = "info", skip_all, fields(url = %raw_url))]
    pub async fn fetch(&self, raw_url: &str) -> Result<FetchResult, FetchError> {
        let url = self.validate_url(raw_url)?;
        let user_agent = self.pick_user_agent().to_string();
        debug!(%user_agent, "Fetching article");

        let t0 = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, HeaderValue::from_static(ACCEPT_HTML))
            .header(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGES))
            .header("upgrade-insecure-requests", HeaderValue::from_static("1"))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Origin returned an error status");
            return Err(FetchError::UpstreamHttp {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("text/html")
            .to_string();

        let html = response.text().await.map_err(|e| self.classify(e))?;

        info!(
            status = status.as_u16(),
            bytes = html.len(),
            %content_type,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched article"
        );

        Ok(FetchResult {
            url: url.to_string(),
            html,
            content_type,
        })
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if e.is_connect() {
            FetchError::HostUnreachable(
                e.url()
                    .and_then(|u| u.host_str())
                    .unwrap_or("unknown host")
                    .to_string(),
            )
        } else if e.is_redirect() {
            FetchError::Unknown(format!("too many redirects: {e}"))
        } else {
            FetchError::Unknown(e.to_string())
        }
    }
}
