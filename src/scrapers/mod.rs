//! Article retrieval and text extraction.
//!
//! Each request runs the two phases in order:
//!
//! 1. **Fetching** ([`fetch`]): download the page with browser-like headers,
//!    classifying transport failures.
//! 2. **Extracting** ([`extract`]): parse the HTML and derive a normalized
//!    article record with generic, site-independent selectors.
//!
//! | Module | Produces | Fails with |
//! |--------|----------|------------|
//! | [`fetch`] | [`crate::models::FetchResult`] | [`fetch::FetchError`] |
//! | [`extract`] | [`crate::models::ExtractedArticle`] | [`extract::ExtractError`] |

pub mod extract;
pub mod fetch;
