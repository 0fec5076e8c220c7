//! HTTP surface: router, shared state and request handlers.

use crate::api::{ChatClient, analyze_article};
use crate::config::ConfigError;
use crate::error::ApiError;
use crate::models::{AnalysisReport, ExtractedArticle};
use crate::scrapers::extract::Extractor;
use crate::scrapers::fetch::{FetchError, Fetcher};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

/// Components shared by every request. Read-only after startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub fetcher: Arc<Fetcher>,
    pub extractor: Arc<Extractor>,
    pub analyzer: Arc<ChatClient>,
}

impl AppState {
    pub fn new(fetcher: Fetcher, extractor: Extractor, analyzer: ChatClient) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            analyzer: Arc::new(analyzer),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UrlParams {
    url: Option<String>,
}

/// CORS limited to the configured browser origins.
pub fn build_cors(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o.trim_end_matches('/'))
                .map_err(|e| ConfigError::Invalid(format!("allowed origin `{o}`: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/scrape", get(scrape_query).post(scrape_body))
        .route("/api/analyze", post(analyze))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "News Bias Analyzer API",
        "endpoints": [
            "GET /health",
            "GET /scrape?url=<article url>",
            "POST /scrape",
            "POST /api/analyze"
        ]
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn scrape_query(
    State(state): State<AppState>,
    params: Result<Query<UrlParams>, QueryRejection>,
) -> Result<Json<ExtractedArticle>, ApiError> {
    let Query(params) = params.map_err(|e| FetchError::invalid("", e.body_text()))?;
    let url = params.url.unwrap_or_default();
    Ok(Json(scrape(&state, &url).await?))
}

async fn scrape_body(
    State(state): State<AppState>,
    body: Result<Json<UrlParams>, JsonRejection>,
) -> Result<Json<ExtractedArticle>, ApiError> {
    let url = url_from_body(body)?;
    Ok(Json(scrape(&state, &url).await?))
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<UrlParams>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let url = url_from_body(body)?;
    let article = scrape(&state, &url).await?;
    let analysis = analyze_article(state.analyzer.as_ref(), &article).await?;

    Ok(Json(AnalysisReport {
        url: article.url.clone(),
        timestamp: Utc::now(),
        article_length: article.content_length,
        article,
        analysis,
    }))
}

fn url_from_body(body: Result<Json<UrlParams>, JsonRejection>) -> Result<String, FetchError> {
    let Json(params) = body.map_err(|e| FetchError::invalid("", e.body_text()))?;
    Ok(params.url.unwrap_or_default())
}

/// Fetch then extract. The parsed document lives only inside the
/// synchronous extract call.
#[instrument(level = "info", skip(state))]
async fn scrape(state: &AppState, url: &str) -> Result<ExtractedArticle, ApiError> {
    let page = state.fetcher.fetch(url).await?;
    let article = state.extractor.extract(&page.url, &page.html)?;
    info!(
        title = %article.title,
        content_length = article.content_length,
        "Article scraped"
    );
    Ok(article)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchSettings, LlmSettings};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><head><title>Budget passes | Daily</title></head><body>
        <nav>Home Politics Sports</nav>
        <article><h1>Budget passes</h1>
        <p>The parliament approved the national budget on Tuesday after a long debate.</p></article>
        <footer>Copyright</footer></body></html>"#;

    const VERDICT: &str = r#"{"overallBiasScore": 2.5, "politicalLeaning": {"leaning": "Neutral", "confidence": 80}, "clickbaitAnalysis": {"isClickbait": false, "score": 5, "reason": "Plain headline"}, "misinformationAnalysis": {"containsMisinformation": false, "confidence": 90, "reason": "Factual"}, "readability": "high"}"#;

    fn app(llm_base: String) -> Router {
        let fetcher = Fetcher::new(&FetchSettings {
            timeout_ms: 2_000,
            ..Default::default()
        })
        .unwrap();
        let analyzer = ChatClient::new(&LlmSettings {
            base_url: llm_base,
            api_key: "sk-test".into(),
            ..Default::default()
        })
        .unwrap();
        let state = AppState::new(fetcher, Extractor::default(), analyzer);
        router(state, build_cors(&["http://localhost:5173".into()]).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn mount_page(server: &MockServer, at: &str, status: u16, html: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(html),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let app = app("http://127.0.0.1:9".into());

        let response = app.clone().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));

        let response = app.oneshot(get_req("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["message"].is_string());
        assert!(
            body["endpoints"]
                .as_array()
                .unwrap()
                .iter()
                .any(|e| e == "POST /api/analyze")
        );
    }

    #[tokio::test]
    async fn test_missing_or_malformed_url_is_invalid_url() {
        let app = app("http://127.0.0.1:9".into());

        for request in [
            get_req("/scrape"),
            get_req("/scrape?url=ftp://example.com/file"),
            post_json("/scrape", "{}"),
            post_json("/scrape", r#"{"url": "not a url"}"#),
            post_json("/api/analyze", "this is not json"),
        ] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = json_body(response).await;
            assert_eq!(body["error"], "invalid_url");
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_scrape_get_and_post_return_article() {
        let server = MockServer::start().await;
        mount_page(&server, "/politics/budget", 200, PAGE).await;
        let app = app(server.uri());
        let url = format!("{}/politics/budget", server.uri());

        let response = app
            .clone()
            .oneshot(get_req(&format!("/scrape?url={url}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["title"], "Budget passes");
        assert_eq!(body["url"], url);
        let content = body["content"].as_str().unwrap();
        assert!(content.contains("approved the national budget"));
        assert!(!content.contains("Copyright"));
        assert_eq!(body["contentLength"], content.chars().count());
        assert!(body["scrapedAt"].is_string());

        let response = app
            .oneshot(post_json("/scrape", &json!({ "url": url }).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["title"], "Budget passes");
    }

    #[tokio::test]
    async fn test_scrape_errors_carry_kind_and_status() {
        let server = MockServer::start().await;
        mount_page(&server, "/empty", 200, "<html><body><nav>Menu</nav></body></html>").await;
        mount_page(&server, "/gone", 404, "not here").await;
        let app = app(server.uri());

        let response = app
            .clone()
            .oneshot(get_req(&format!("/scrape?url={}/empty", server.uri())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"], "no_content_found");

        let response = app
            .oneshot(get_req(&format!("/scrape?url={}/gone", server.uri())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "upstream_http_error");
    }

    #[tokio::test]
    async fn test_analyze_end_to_end() {
        let server = MockServer::start().await;
        mount_page(&server, "/politics/budget", 200, PAGE).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": VERDICT } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/politics/budget", server.uri());
        let response = app(server.uri())
            .oneshot(post_json("/api/analyze", &json!({ "url": url }).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["url"], url);
        assert_eq!(body["articleLength"], body["article"]["contentLength"]);
        assert_eq!(body["article"]["title"], "Budget passes");
        assert_eq!(body["analysis"]["overallBiasScore"], 2.5);
        assert_eq!(body["analysis"]["politicalLeaning"]["leaning"], "Neutral");
        assert_eq!(body["analysis"]["readability"], "high");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_collaborator_failure_hides_detail() {
        let server = MockServer::start().await;
        mount_page(&server, "/politics/budget", 200, PAGE).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded for org-4431"))
            .mount(&server)
            .await;

        let url = format!("{}/politics/budget", server.uri());
        let response = app(server.uri())
            .oneshot(post_json("/api/analyze", &json!({ "url": url }).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "unknown_analysis_error");
        assert!(!body.to_string().contains("org-4431"));
    }

    #[tokio::test]
    async fn test_analyze_unparseable_verdict_is_format_error() {
        let server = MockServer::start().await;
        mount_page(&server, "/politics/budget", 200, PAGE).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "I am unable to help with that." } }]
            })))
            .mount(&server)
            .await;

        let url = format!("{}/politics/budget", server.uri());
        let response = app(server.uri())
            .oneshot(post_json("/api/analyze", &json!({ "url": url }).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"], "analysis_format_error");
    }

    #[tokio::test]
    async fn test_cors_allows_only_configured_origins() {
        let app = app("http://127.0.0.1:9".into());
        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/api/analyze")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .clone()
            .oneshot(preflight("http://localhost:5173"))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );

        let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_build_cors_rejects_unencodable_origin() {
        assert!(build_cors(&["http://ok.example".into()]).is_ok());
        assert!(matches!(
            build_cors(&["http://bad\norigin".into()]),
            Err(ConfigError::Invalid(_))
        ));
    }
}
