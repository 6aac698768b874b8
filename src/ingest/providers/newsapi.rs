//! NewsAPI `everything` search (topic digest source).
use async_trait::async_trait;
use std::time::Duration;

use super::{http_client, read_json};
use crate::ingest::types::{FetchError, NewsPayload, NewsQuery, NewsSearch};

const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";

pub struct NewsApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NewsApiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            http: http_client(Duration::from_secs(20))?,
            api_key: api_key.into(),
            base_url: NEWSAPI_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn params(&self, query: &NewsQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.q.clone()),
            ("language", "en".to_string()),
            ("sortBy", "relevancy".to_string()),
            ("pageSize", query.page_size.to_string()),
            ("apiKey", self.api_key.clone()),
        ];
        if let Some(from) = query.from {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = query.to {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        params
    }
}

#[async_trait]
impl NewsSearch for NewsApiClient {
    async fn search(&self, query: &NewsQuery) -> Result<NewsPayload, FetchError> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&self.params(query))
            .send()
            .await?;
        // NewsAPI reports errors as JSON bodies with non-2xx codes; keep the message.
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if let Ok(payload @ NewsPayload::Articles { .. }) = serde_json::from_str::<NewsPayload>(&body) {
                return Ok(payload);
            }
            return Err(FetchError::Status(status.as_u16()));
        }
        read_json(resp).await
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
