//! LLM API interaction for bias analysis.
//!
//! The bias/clickbait/misinformation judgment itself is delegated to an
//! OpenAI-compatible chat-completions API. This module owns the client side
//! of that contract:
//!
//! - [`AskAsync`]: core trait for sending a prompt and getting text back
//! - [`ChatClient`]: [`AskAsync`] over `POST {base_url}/chat/completions`
//! - [`build_prompt`]: the fixed instruction text plus the article
//! - [`extract_json_object`] / [`parse_verdict`]: locate and parse the one
//!   JSON object in the model's reply
//! - [`analyze_article`]: the whole round trip for one article
//!
//! # Failure Policy
//!
//! There are no retries. Transport errors and non-2xx replies are
//! [`AnalysisError::Unknown`]; a reply without a parsable JSON object or
//! missing a required field is [`AnalysisError::Format`]. Required fields
//! are never filled with defaults.

use crate::config::LlmSettings;
use crate::models::{BiasVerdict, ExtractedArticle};
use crate::utils::{looks_truncated, truncate_for_log};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

const SYSTEM_PROMPT: &str = "You are an expert media analyst specializing in Bangladeshi news \
outlets, politics and media ownership. You assess articles for political bias, clickbait and \
misinformation. You always answer with a single JSON object and nothing else.";

const INSTRUCTIONS: &str = r#"Analyze the following news article and respond with ONLY a JSON object of this exact shape:
{
  "overallBiasScore": <number 0-100, 0 = neutral>,
  "trustworthinessRating": <number 0-10>,
  "politicalLeaning": {
    "leaning": <one of "Leans Awami League", "Leans BNP", "Leans Jamaat-e-Islami", "Leans Jatiya Party", "Leans NCP", "Neutral">,
    "confidence": <number 0-100>
  },
  "ownershipAnalysis": { "owner": <string>, "politicalAffiliation": <string>, "summary": <string> },
  "misinformationAnalysis": { "containsMisinformation": <bool>, "confidence": <number 0-100>, "reason": <string> },
  "clickbaitAnalysis": { "isClickbait": <bool>, "score": <number 0-100>, "reason": <string> },
  "keyBiasIndicators": [<string>, ...],
  "detailedReasoning": <string>
}
The article may be written in Bengali or English; answer in English."#;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("model response did not contain a usable verdict: {0}")]
    Format(String),
    #[error("analysis request failed: {0}")]
    Unknown(String),
}

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a model and return its raw text reply.
pub trait AskAsync {
    async fn ask(&self, prompt: &str) -> Result<String, AnalysisError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

impl AskAsync for ChatClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String, AnalysisError> {
        let t0 = Instant::now();
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AnalysisError::Unknown(format!("request to LLM API failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Unknown(format!(
                "LLM API returned {status}: {}",
                truncate_for_log(&body, 300)
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| AnalysisError::Format(format!("unreadable completion envelope: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AnalysisError::Format("completion has no message content".into()))?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            reply_bytes = content.len(),
            "LLM replied"
        );
        Ok(content)
    }
}

/// Fixed instructions followed by the article's title and body text.
///
/// # Arguments
///
/// * `article` - The extracted article; its content is already normalized
///   and length-capped, so the prompt size is bounded
///
/// # Returns
///
/// The complete user message sent to the model.
pub fn build_prompt(article: &ExtractedArticle) -> String {
    format!(
        "{INSTRUCTIONS}\n\nTitle: {}\n\nArticle:\n{}",
        article.title, article.content
    )
}

/// Return the span from the first `{` to the last `}` of a model reply.
///
/// Models like to wrap their JSON in prose or code fences; only this span
/// is handed to the JSON parser.
///
/// # Errors
///
/// [`AnalysisError::Format`] when the reply has no `{` before a `}`.
pub fn extract_json_object(reply: &str) -> Result<&str, AnalysisError> {
    match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&reply[start..=end]),
        _ => Err(AnalysisError::Format(
            "reply does not contain a JSON object".into(),
        )),
    }
}

/// Parse a model reply into a [`BiasVerdict`].
pub fn parse_verdict(reply: &str) -> Result<BiasVerdict, AnalysisError> {
    let span = extract_json_object(reply)?;
    serde_json::from_str::<BiasVerdict>(span).map_err(|e| {
        if looks_truncated(&e) {
            warn!(error = %e, "Model JSON looks truncated");
        }
        AnalysisError::Format(e.to_string())
    })
}

/// Send one article to the model and parse its verdict.
///
/// # Arguments
///
/// * `asker` - Any [`AskAsync`] implementation (the real client or a test double)
/// * `article` - The article to judge
///
/// # Returns
///
/// The typed [`BiasVerdict`]. Transport failures come back as
/// [`AnalysisError::Unknown`]; a reply without a conforming JSON object as
/// [`AnalysisError::Format`].
#[instrument(level = "info", skip_all, fields(url = %article.url, content_length = article.content_length))]
pub async fn analyze_article<A: AskAsync>(
    asker: &A,
    article: &ExtractedArticle,
) -> Result<BiasVerdict, AnalysisError> {
    let t0 = Instant::now();
    let reply = asker.ask(&build_prompt(article)).await?;

    match parse_verdict(&reply) {
        Ok(verdict) => {
            info!(
                elapsed_ms_total = t0.elapsed().as_millis() as u64,
                overall_bias_score = verdict.overall_bias_score,
                "Analysis succeeded"
            );
            Ok(verdict)
        }
        Err(e) => {
            error!(
                error = %e,
                response_preview = %truncate_for_log(&reply, 300),
                "Model returned non-conforming JSON"
            );
            Err(e)
        }
    }
}
