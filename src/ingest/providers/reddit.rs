//! Reddit search over the OAuth API (application-only token).
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{http_client, read_json};
use crate::dates::RecencyBucket;
use crate::ingest::types::{DiscussionSearch, FetchError, RawPost, RawReply};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
/// Refresh this long before the advertised expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    #[serde(default)]
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    link_flair_text: Option<String>,
}

/// Comment listings mix comments ("t1") with "more" stubs, so every field is optional.
#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    score: i64,
}

pub struct RedditClient {
    http: reqwest::Client,
    client_id: String,
    secret: String,
    token_url: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditClient {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            http: http_client(Duration::from_secs(15))?,
            client_id: client_id.into(),
            secret: secret.into(),
            token_url: TOKEN_URL.to_string(),
            api_base: API_BASE.to_string(),
            token: Mutex::new(None),
        })
    }

    pub fn with_base_urls(mut self, token_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Cached app-only token, re-requested once it is about to expire.
    async fn token(&self) -> Result<String, FetchError> {
        let mut slot = self.token.lock().await;
        if let Some(t) = slot.as_ref().filter(|t| Instant::now() < t.expires_at) {
            return Ok(t.value.clone());
        }
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let tok: TokenResp = read_json(resp).await?;
        let lifetime = Duration::from_secs(tok.expires_in).saturating_sub(EXPIRY_MARGIN);
        tracing::debug!(expires_in = tok.expires_in, "reddit token acquired");
        *slot = Some(CachedToken {
            value: tok.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(tok.access_token)
    }

    /// Authorized GET; a 401 drops the cached token and retries once.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{path}", self.api_base);
        let mut retried = false;
        loop {
            let token = self.token().await?;
            let resp = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(query)
                .send()
                .await?;
            if resp.status() == reqwest::StatusCode::UNAUTHORIZED && !retried {
                tracing::debug!("reddit token rejected; refreshing");
                *self.token.lock().await = None;
                retried = true;
                continue;
            }
            return read_json(resp).await;
        }
    }
}

fn to_raw_post(p: PostData) -> RawPost {
    RawPost {
        id: p.id,
        title: p.title,
        body: p.selftext,
        score: p.score,
        num_comments: p.num_comments,
        created_utc: p.created_utc as i64,
        url: p.url,
        flair: p.link_flair_text,
    }
}

#[async_trait]
impl DiscussionSearch for RedditClient {
    async fn search(
        &self,
        community: &str,
        query: &str,
        recency: RecencyBucket,
        limit: usize,
    ) -> Result<Vec<RawPost>, FetchError> {
        let listing: Listing<PostData> = self
            .get_json(
                &format!("/r/{community}/search"),
                &[
                    ("q", query.to_string()),
                    ("restrict_sr", "1".to_string()),
                    ("sort", "relevance".to_string()),
                    ("t", recency.as_str().to_string()),
                    ("limit", limit.to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|t| to_raw_post(t.data))
            .collect())
    }

    async fn top_replies(&self, post: &RawPost, limit: usize) -> Result<Vec<RawReply>, FetchError> {
        let (_, comments): (serde_json::Value, Listing<CommentData>) = self
            .get_json(
                &format!("/comments/{}", post.id),
                &[
                    ("limit", limit.to_string()),
                    ("depth", "1".to_string()),
                    ("sort", "top".to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await?;
        Ok(comments
            .data
            .children
            .into_iter()
            .filter(|t| t.kind == "t1")
            .filter_map(|t| {
                t.data.body.map(|body| RawReply {
                    body,
                    score: t.data.score,
                })
            })
            .take(limit)
            .collect())
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
