//! Request-level error type and its HTTP rendering.
//!
//! Every failure of a request maps to exactly one kind. The kind string and
//! a human-readable message are sent to the caller as
//! `{"error": <kind>, "message": <message>}`; the two catch-all kinds are
//! logged in full here and reported with a generic message only.

use crate::api::AnalysisError;
use crate::scrapers::extract::ExtractError;
use crate::scrapers::fetch::FetchError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ApiError {
    /// Machine-checkable kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Fetch(FetchError::InvalidUrl { .. }) => "invalid_url",
            ApiError::Fetch(FetchError::DomainNotAllowed(_)) => "domain_not_allowed",
            ApiError::Fetch(FetchError::HostUnreachable(_)) => "host_unreachable",
            ApiError::Fetch(FetchError::Timeout(_)) => "timeout",
            ApiError::Fetch(FetchError::UpstreamHttp { .. }) => "upstream_http_error",
            ApiError::Fetch(FetchError::Unknown(_)) => "unknown_fetch_error",
            ApiError::Extract(ExtractError::NoContentFound) => "no_content_found",
            ApiError::Analysis(AnalysisError::Format(_)) => "analysis_format_error",
            ApiError::Analysis(AnalysisError::Unknown(_)) => "unknown_analysis_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Fetch(FetchError::InvalidUrl { .. })
            | ApiError::Fetch(FetchError::DomainNotAllowed(_)) => StatusCode::BAD_REQUEST,
            ApiError::Fetch(FetchError::HostUnreachable(_)) => StatusCode::NOT_FOUND,
            ApiError::Fetch(FetchError::Timeout(_)) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Fetch(FetchError::UpstreamHttp { status }) => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ApiError::Extract(ExtractError::NoContentFound) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Analysis(AnalysisError::Format(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Fetch(FetchError::Unknown(_))
            | ApiError::Analysis(AnalysisError::Unknown(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the caller. Catch-all kinds never expose their
    /// internal detail.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Fetch(FetchError::InvalidUrl { .. }) => {
                "Please provide a valid URL starting with http:// or https://".to_string()
            }
            ApiError::Fetch(FetchError::DomainNotAllowed(host)) => {
                format!("`{host}` is not one of the supported news sites")
            }
            ApiError::Fetch(FetchError::HostUnreachable(_)) => {
                "The provided URL could not be reached. Please check the URL and try again."
                    .to_string()
            }
            ApiError::Fetch(FetchError::Timeout(_)) => {
                "The website took too long to respond. Please try again later.".to_string()
            }
            ApiError::Fetch(FetchError::UpstreamHttp { status }) => {
                format!("The website returned an error: HTTP {status}")
            }
            ApiError::Extract(ExtractError::NoContentFound) => {
                "No article text could be found at this URL.".to_string()
            }
            ApiError::Analysis(AnalysisError::Format(_)) => {
                "The analysis service returned an unexpected response. Please try again."
                    .to_string()
            }
            ApiError::Fetch(FetchError::Unknown(_)) => {
                "An unexpected error occurred while fetching the article.".to_string()
            }
            ApiError::Analysis(AnalysisError::Unknown(_)) => {
                "An unexpected error occurred while analyzing the article.".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        if status.is_server_error() {
            error!(kind, error = %self, "Request failed");
        } else {
            warn!(kind, error = %self, "Request rejected");
        }

        let body = Json(json!({ "error": kind, "message": self.public_message() }));
        (status, body).into_response()
    }
}
