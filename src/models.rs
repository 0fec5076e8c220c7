//! Data models for fetched pages, extracted articles and model verdicts.
//!
//! This module defines the records that flow through a single request:
//! - [`FetchResult`]: Raw HTML returned by the fetcher
//! - [`ExtractedArticle`]: Normalized article derived from one `FetchResult`
//! - [`BiasVerdict`]: The LLM's bias/clickbait/misinformation judgment
//! - [`AnalysisReport`]: The `/api/analyze` response body
//!
//! Everything here is created per request and dropped once the response is
//! sent. The serialized field names are camelCase to match the browser front
//! end and the JSON schema requested from the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw page as returned by [`crate::scrapers::fetch::Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The validated absolute URL that was requested.
    pub url: String,
    /// The response body, decoded as text.
    pub html: String,
    /// The origin's `Content-Type`, or `text/html` when it sent none.
    pub content_type: String,
}

/// A normalized news article.
///
/// `title` and `content` may individually be empty, but never both: the
/// extractor reports `NoContentFound` instead of building such a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedArticle {
    pub url: String,
    pub title: String,
    /// Whitespace-normalized body text, possibly cut to the configured cap.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// RFC 3339 when a `datetime` attribute parsed, otherwise the raw value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    pub scraped_at: DateTime<Utc>,
    /// Character count of `content` as returned.
    pub content_length: usize,
}

/// The model's verdict on an article.
///
/// Required fields fail deserialization when absent; nothing is defaulted
/// for them. Fields outside this schema are kept in `extra` and relayed to
/// the caller untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BiasVerdict {
    /// 0 (neutral) to 100 (heavily biased). Older prompts called it `biasScore`.
    ///
    /// Either name is accepted, but not both: a reply carrying `biasScore`
    /// and `overallBiasScore` together is rejected as a duplicate field.
    #[serde(alias = "biasScore")]
    pub overall_bias_score: f64,
    pub political_leaning: PoliticalLeaning,
    pub clickbait_analysis: ClickbaitAnalysis,
    pub misinformation_analysis: MisinformationAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trustworthiness_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_analysis: Option<OwnershipAnalysis>,
    #[serde(default)]
    pub key_bias_indicators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_reasoning: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which party the article leans towards, e.g. `"Neutral"` or `"Leans BNP"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoliticalLeaning {
    pub leaning: String,
    /// Percentage, 0-100.
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickbaitAnalysis {
    pub is_clickbait: bool,
    pub score: f64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MisinformationAnalysis {
    pub contains_misinformation: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
}

/// The outlet's owner and their known affiliation, as far as the model knows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipAnalysis {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub political_affiliation: String,
    #[serde(default)]
    pub summary: String,
}

/// Response body of `POST /api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub url: String,
    pub timestamp: DateTime<Utc>,
    /// Same as `article.content_length`; kept at the top level for the UI.
    pub article_length: usize,
    pub article: ExtractedArticle,
    pub analysis: BiasVerdict,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verdict_json() -> Value {
        json!({
            "overallBiasScore": 42.0,
            "trustworthinessRating": 7.5,
            "politicalLeaning": { "leaning": "Neutral", "confidence": 80 },
            "ownershipAnalysis": {
                "owner": "Transcom Group",
                "politicalAffiliation": "None known",
                "summary": "Privately owned."
            },
            "misinformationAnalysis": {
                "containsMisinformation": false,
                "confidence": 90,
                "reason": "Claims are sourced."
            },
            "clickbaitAnalysis": { "isClickbait": false, "score": 10, "reason": "Plain headline." },
            "keyBiasIndicators": ["Neutral language"],
            "detailedReasoning": "Balanced."
        })
    }

    #[test]
    fn test_verdict_deserializes_full_schema() {
        let v: BiasVerdict = serde_json::from_value(verdict_json()).unwrap();
        assert_eq!(v.overall_bias_score, 42.0);
        assert_eq!(v.political_leaning.leaning, "Neutral");
        assert_eq!(v.clickbait_analysis.score, 10.0);
        assert!(!v.misinformation_analysis.contains_misinformation);
        assert_eq!(v.ownership_analysis.unwrap().owner, "Transcom Group");
        assert!(v.extra.is_empty());
    }

    #[test]
    fn test_verdict_accepts_legacy_bias_score_name() {
        let mut raw = verdict_json();
        let obj = raw.as_object_mut().unwrap();
        let score = obj.remove("overallBiasScore").unwrap();
        obj.insert("biasScore".into(), score);

        let v: BiasVerdict = serde_json::from_value(raw).unwrap();
        assert_eq!(v.overall_bias_score, 42.0);
    }

    #[test]
    fn test_verdict_rejects_both_score_names() {
        let mut raw = verdict_json();
        raw["biasScore"] = json!(40.0);

        let err = serde_json::from_str::<BiasVerdict>(&raw.to_string()).unwrap_err();
        assert!(err.to_string().contains("duplicate field"), "{err}");
    }

    #[test]
    fn test_verdict_keeps_unknown_fields() {
        let mut raw = verdict_json();
        raw["emotionalTone"] = json!("neutral");

        let v: BiasVerdict = serde_json::from_value(raw).unwrap();
        assert_eq!(v.extra.get("emotionalTone"), Some(&json!("neutral")));

        let back = serde_json::to_value(&v).unwrap();
        assert_eq!(back["emotionalTone"], json!("neutral"));
        assert_eq!(back["overallBiasScore"], json!(42.0));
    }

    #[test]
    fn test_verdict_rejects_missing_required_field() {
        let mut raw = verdict_json();
        raw.as_object_mut().unwrap().remove("clickbaitAnalysis");
        assert!(serde_json::from_value::<BiasVerdict>(raw).is_err());
    }

    #[test]
    fn test_article_serializes_camel_case_and_skips_absent_metadata() {
        let article = ExtractedArticle {
            url: "https://www.prothomalo.com/a".into(),
            title: "Title".into(),
            content: "Body".into(),
            author: None,
            publish_date: None,
            scraped_at: Utc::now(),
            content_length: 4,
        };
        let v = serde_json::to_value(&article).unwrap();
        assert_eq!(v["contentLength"], json!(4));
        assert!(v.get("scrapedAt").is_some());
        assert!(v.get("author").is_none());
        assert!(v.get("publishDate").is_none());
    }
}
