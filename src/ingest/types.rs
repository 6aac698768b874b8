// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dates::RecencyBucket;

/// Source-agnostic record produced by every fetcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedRecord {
    pub title: String,
    pub body_preview: String,
    pub source_label: String, // community or publication
    pub published_at: String,
    pub engagement_score: Option<i64>,
    #[serde(default)]
    pub comment_count: Option<u64>,
    #[serde(default)]
    pub flair: Option<String>,
    pub sentiment: f64, // [-1, 1]
    pub url: String,
    pub llm_text: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("api error ({code}): {message}")]
    Api { code: String, message: String },
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Short label used in logs so transport and content failures stay distinguishable.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Status(_) => "status",
            FetchError::Api { .. } => "api",
            FetchError::Malformed(_) => "malformed",
        }
    }
}

/// Raw post returned by a discussion search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    pub created_utc: i64, // unix seconds
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub flair: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawReply {
    pub body: String,
    pub score: i64,
}

#[async_trait::async_trait]
pub trait DiscussionSearch: Send + Sync {
    /// Search one community. `query` is already quoted.
    async fn search(
        &self,
        community: &str,
        query: &str,
        recency: RecencyBucket,
        limit: usize,
    ) -> Result<Vec<RawPost>, FetchError>;

    /// Top-level replies of a post, best first.
    async fn top_replies(&self, post: &RawPost, limit: usize) -> Result<Vec<RawReply>, FetchError>;

    fn name(&self) -> &'static str;
}

/// Parameters for one news search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsQuery {
    pub q: String,
    pub from: Option<chrono::NaiveDate>,
    pub to: Option<chrono::NaiveDate>,
    pub page_size: u32,
    pub recency: Option<RecencyBucket>,
}

/// Shapes returned by the news collaborators.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NewsPayload {
    /// `{ "news_results": [...] }`
    Results { news_results: Vec<ResultItem> },
    /// `{ "status": "ok", "totalResults": n, "articles": [...] }`
    Articles {
        status: String,
        #[serde(default, rename = "totalResults")]
        total_results: u64,
        #[serde(default)]
        articles: Vec<ArticleItem>,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// `{ "error": "..." }`
    Error { error: String },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResultItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub source: Option<ResultSource>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Result sources come either as a plain name or as `{ "name": ... }`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResultSource {
    Name(String),
    Detailed { name: Option<String> },
}

impl ResultSource {
    pub fn name(&self) -> Option<&str> {
        match self {
            ResultSource::Name(n) => Some(n.as_str()),
            ResultSource::Detailed { name } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ArticleItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<ArticleSource>,
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

/// Common article shape both payloads normalize into.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub source_name: String,
    pub published_at: String,
    pub url: String,
}

#[async_trait::async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &NewsQuery) -> Result<NewsPayload, FetchError>;
    fn name(&self) -> &'static str;
}
