//! Search request and response types.
//!
//! [`SearchRequest`] is what the client sends to the proxy. The proxy turns it into an
//! [`UpstreamSearchRequest`] with [`SearchRequest::normalize`] before calling the provider.
//! [`SearchResponse`] is the provider's success body, passed through by the proxy and decoded by
//! the client.

use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{AnyJson, Record};

/// Number of results requested when the caller does not ask for a valid amount.
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest number of results the provider is asked for.
pub const MAX_LIMIT: u32 = 30;

/// Search sources understood by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Web,
    News,
    Images,
}

/// Scrape options as sent by the client. Every field is optional.
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_main_content: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
}

/// A search request.
///
/// Fields are deliberately loose so that any JSON object can be parsed and then rejected with a
/// precise reason, instead of failing deserialization.
///
/// ```
/// use x402_search_core::search::{SearchRequest, Source};
///
/// let request = SearchRequest::builder()
///     .query("x402 protocol")
///     .limit(50)
///     .build();
///
/// let upstream = request.normalize().unwrap();
/// assert_eq!(upstream.limit, 30);
/// assert_eq!(upstream.sources, vec![Source::Web]);
/// assert!(upstream.scrape_options.is_none());
/// ```
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    #[builder(into, default)]
    pub query: String,
    /// Any JSON number is accepted; out of range values saturate and are clamped by
    /// [`SearchRequest::normalize`].
    #[serde(
        default,
        deserialize_with = "saturating_limit",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(with = |iter: impl IntoIterator<Item = Source>| iter.into_iter().collect())]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_options: Option<ScrapeOptions>,
}

fn saturating_limit<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(number.map(|number| {
        if let Some(limit) = number.as_i64() {
            limit
        } else if number.is_u64() {
            i64::MAX
        } else {
            // Float casts saturate.
            number.as_f64().map(|limit| limit as i64).unwrap_or(i64::MAX)
        }
    }))
}

/// Reasons a [`SearchRequest`] cannot be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Query is required")]
    MissingQuery,
}

/// Scrape options forwarded to the provider, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamScrapeOptions {
    pub only_main_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

/// The body actually sent to the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamSearchRequest {
    pub query: String,
    pub limit: u32,
    pub sources: Vec<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_options: Option<UpstreamScrapeOptions>,
}

impl SearchRequest {
    /// Check the request can be sent. Only the query is mandatory.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.query.trim().is_empty() {
            return Err(RequestError::MissingQuery);
        }
        Ok(())
    }

    /// Apply provider defaults and bounds.
    ///
    /// - `limit`: absent or below 1 becomes [`DEFAULT_LIMIT`], above [`MAX_LIMIT`] is clamped.
    /// - `sources`: absent or empty becomes `[web]`; duplicates are dropped, order is kept.
    /// - `scrapeOptions`: only forwarded when present; `onlyMainContent` defaults to `true` and a
    ///   non-positive `maxAge` is dropped.
    pub fn normalize(&self) -> Result<UpstreamSearchRequest, RequestError> {
        self.validate()?;

        let limit = match self.limit {
            Some(limit) if limit >= 1 => limit.min(MAX_LIMIT as i64) as u32,
            _ => DEFAULT_LIMIT,
        };

        let mut sources: Vec<Source> = Vec::new();
        for source in self.sources.iter().flatten() {
            if !sources.contains(source) {
                sources.push(*source);
            }
        }
        if sources.is_empty() {
            sources.push(Source::Web);
        }

        let scrape_options = self
            .scrape_options
            .as_ref()
            .map(|options| UpstreamScrapeOptions {
                only_main_content: options.only_main_content.unwrap_or(true),
                max_age: options
                    .max_age
                    .filter(|age| *age > 0)
                    .map(|age| age as u64),
            });

        Ok(UpstreamSearchRequest {
            query: self.query.clone(),
            limit,
            sources,
            scrape_options,
        })
    }
}

/// One web result returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub raw_html: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub metadata: Record<AnyJson>,
}

impl WebResult {
    /// The title to show, falling back to the page metadata.
    pub fn display_title(&self) -> &str {
        if !self.title.is_empty() {
            return &self.title;
        }
        self.metadata_str("title").unwrap_or(&self.url)
    }

    /// The best short description available: description, then summary, then metadata.
    pub fn display_description(&self) -> &str {
        if !self.description.is_empty() {
            &self.description
        } else if !self.summary.is_empty() {
            &self.summary
        } else {
            self.metadata_str("description").unwrap_or_default()
        }
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(AnyJson::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Result groups of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub web: Vec<WebResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<AnyJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news: Option<Vec<AnyJson>>,
}

/// The provider's success body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(default)]
    pub data: SearchData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
