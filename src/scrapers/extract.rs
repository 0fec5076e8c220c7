//! Article text extraction.
//!
//! Turns raw HTML into an [`ExtractedArticle`] with generic selectors that
//! work across Bangladeshi news sites without per-site rules.
//!
//! # Pipeline
//!
//! 1. Parse the document.
//! 2. Resolve title, author and publish date on the full document (site
//!    headers often hold the `<h1>` and byline).
//! 3. Detach noise (scripts, navigation, header/footer, ads, share widgets).
//! 4. Run every body candidate and keep the longest text; ties go to the
//!    earlier, more specific candidate. An optional `early_exit_chars`
//!    threshold takes the first candidate longer than it instead.
//! 5. Normalize whitespace, apply the length cap, and reject pages where
//!    both title and body came out empty.

use crate::config::ExtractSettings;
use crate::models::ExtractedArticle;
use crate::utils::{normalize_whitespace, truncate_chars};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no article title or body text could be found on the page")]
    NoContentFound,
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static NOISE: Lazy<Selector> = Lazy::new(|| {
    sel(concat!(
        "script, style, noscript, template, iframe, svg, nav, header, footer, aside, ",
        "[class*=\"advert\"], [id*=\"advert\"], [class~=\"ad\"], [class~=\"ads\"], ",
        "[class*=\"ad-slot\"], [class*=\"ad-container\"], [class*=\"sponsor\"], ",
        "[class*=\"social\"], [class*=\"share\"]"
    ))
});

static H1: Lazy<Selector> = Lazy::new(|| sel("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| sel("title"));
static TITLE_CLASS: Lazy<Selector> =
    Lazy::new(|| sel("[class*=\"title\"], [class*=\"headline\"]"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| sel("[class*=\"author\"], [rel=\"author\"]"));
static DATE: Lazy<Selector> = Lazy::new(|| sel("time, [class*=\"date\"]"));

/// Body candidates, most specific first.
static BODY_CANDIDATES: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    [
        "article",
        "[class*=\"content\"]",
        "[class*=\"article\"]",
        "[class*=\"story\"]",
        "[class*=\"post-content\"]",
        ".entry-content",
        "main p",
        "body p",
    ]
    .into_iter()
    .map(|css| (css, sel(css)))
    .collect()
});

/// Stateless HTML-to-article extractor.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    max_content_chars: Option<usize>,
    early_exit_chars: Option<usize>,
}

impl Extractor {
    /// Build an extractor from settings.
    ///
    /// # Arguments
    ///
    /// * `settings` - `max_content_chars` caps the returned body (`0` or
    ///   `None` disables the cap); `early_exit_chars` enables the first
    ///   long-enough-candidate shortcut
    pub fn new(settings: &ExtractSettings) -> Self {
        Self {
            max_content_chars: settings.max_content_chars.filter(|&n| n > 0),
            early_exit_chars: settings.early_exit_chars,
        }
    }

    /// Extract a normalized article from `html` fetched from `url`.
    ///
    /// # Returns
    ///
    /// An [`ExtractedArticle`] whose `content_length` is the character
    /// count after the cap was applied.
    ///
    /// # Errors
    ///
    /// [`ExtractError::NoContentFound`] when neither a title nor any body
    /// text survives normalization.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub fn extract(&self, url: &str, html: &str) -> Result<ExtractedArticle, ExtractError> {
        let mut document = Html::parse_document(html);

        let title = resolve_title(&document);
        let author = first_text(&document, &AUTHOR);
        let publish_date = resolve_publish_date(&document);

        strip_noise(&mut document);

        let (winner, content) = match self.select_body(&document) {
            Some((name, text)) => (Some(name), text),
            None => (None, String::new()),
        };

        if title.is_empty() && content.is_empty() {
            info!("No title or body text found");
            return Err(ExtractError::NoContentFound);
        }

        let full_length = content.chars().count();
        let content = match self.max_content_chars {
            Some(max) => truncate_chars(&content, max).to_string(),
            None => content,
        };
        let content_length = content.chars().count();

        info!(
            selector = winner.unwrap_or("none"),
            title_chars = title.chars().count(),
            content_length,
            truncated = content_length < full_length,
            "Extracted article"
        );

        Ok(ExtractedArticle {
            url: url.to_string(),
            title,
            content,
            author,
            publish_date,
            scraped_at: Utc::now(),
            content_length,
        })
    }

    fn select_body(&self, document: &Html) -> Option<(&'static str, String)> {
        let mut best: Option<(&'static str, String, usize)> = None;

        for (name, selector) in BODY_CANDIDATES.iter() {
            let name: &'static str = *name;
            let text = candidate_text(document, selector);
            if text.is_empty() {
                continue;
            }
            let len = text.chars().count();
            debug!(selector = name, len, "Body candidate");

            if self.early_exit_chars.is_some_and(|threshold| len > threshold) {
                return Some((name, text));
            }
            let longer = match &best {
                Some((_, _, best_len)) => len > *best_len,
                None => true,
            };
            if longer {
                best = Some((name, text, len));
            }
        }

        best.map(|(name, text, _)| (name, text))
    }
}

/// Elements whose boundaries separate words even without surrounding
/// whitespace in the markup.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table",
    "td", "th", "tr", "ul",
];

/// Concatenated text of `element` and its descendants. Inline markup joins
/// without a separator; block elements are separated by a space.
fn raw_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if BLOCK_TAGS.contains(&el.name()) => out.push(' '),
            _ => {}
        }
    }
    out
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&raw_text(element))
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

/// First `<h1>`, then `<title>`, then anything classed as a title/headline.
fn resolve_title(document: &Html) -> String {
    first_text(document, &H1)
        .or_else(|| first_text(document, &TITLE))
        .or_else(|| first_text(document, &TITLE_CLASS))
        .unwrap_or_default()
}

/// First non-empty `datetime` attribute among date candidates; only when
/// none carries one, the first non-empty visible text.
fn resolve_publish_date(document: &Html) -> Option<String> {
    let machine = document.select(&DATE).find_map(|element| {
        element
            .value()
            .attr("datetime")
            .map(str::trim)
            .filter(|v| !v.is_empty())
    });
    if let Some(raw) = machine {
        return Some(
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|_| raw.to_string()),
        );
    }
    first_text(document, &DATE)
}

fn strip_noise(document: &mut Html) {
    let noise: Vec<_> = document.select(&NOISE).map(|e| e.id()).collect();
    let removed = noise.len();
    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
    debug!(removed, "Stripped noise elements");
}

/// Text of the top-most elements matched by `selector`, so a match nested
/// inside another match of the same selector is not counted twice.
fn candidate_text(document: &Html, selector: &Selector) -> String {
    let matched: Vec<ElementRef<'_>> = document.select(selector).collect();
    let ids: HashSet<_> = matched.iter().map(|e| e.id()).collect();

    let text = matched
        .iter()
        .filter(|e| !e.ancestors().any(|a| ids.contains(&a.id())))
        .map(|e| raw_text(*e))
        .join(" ");
    normalize_whitespace(&text)
}
