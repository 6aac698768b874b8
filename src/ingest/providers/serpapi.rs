//! Google News search through SerpAPI (daily market digest source).
use async_trait::async_trait;
use std::time::Duration;

use super::{http_client, read_json};
use crate::ingest::types::{FetchError, NewsPayload, NewsQuery, NewsSearch};

const SERPAPI_URL: &str = "https://serpapi.com/search";

pub struct SerpApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            http: http_client(Duration::from_secs(30))?,
            api_key: api_key.into(),
            base_url: SERPAPI_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn params(&self, query: &NewsQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("engine", "google".to_string()),
            ("tbm", "nws".to_string()),
            ("q", query.q.clone()),
            ("num", query.page_size.to_string()),
            ("api_key", self.api_key.clone()),
        ];
        if let Some(tbs) = query.recency.and_then(|r| r.as_serp_tbs()) {
            params.push(("tbs", tbs.to_string()));
        }
        params
    }
}

#[async_trait]
impl NewsSearch for SerpApiClient {
    async fn search(&self, query: &NewsQuery) -> Result<NewsPayload, FetchError> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&self.params(query))
            .send()
            .await?;
        read_json(resp).await
    }

    fn name(&self) -> &'static str {
        "serpapi"
    }
}
