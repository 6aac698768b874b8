// tests/common/mod.rs
//
// In-process stand-ins for every external collaborator.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use market_intel::dates::RecencyBucket;
use market_intel::ingest::config::SourcesCatalog;
use market_intel::ingest::discussion::{DiscussionFetcher, DiscussionSettings};
use market_intel::ingest::news::NewsFetcher;
use market_intel::ingest::types::{
    DiscussionSearch, FetchError, NewsPayload, NewsQuery, NewsSearch, RawPost, RawReply,
};
use market_intel::insight::InsightGenerator;
use market_intel::llm::{LlmClient, LlmError, LlmReply, SafetySetting};
use market_intel::notify::{DigestEmail, MailTransport, SubscriberStore};

// ---------------------------------------------------------------- LLM

pub enum LlmBehavior {
    Text(String),
    Blocked(Option<String>),
    Fail,
}

pub struct StubLlm {
    behavior: LlmBehavior,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn new(behavior: LlmBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn text(t: &str) -> Arc<Self> {
        Self::new(LlmBehavior::Text(t.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl LlmClient for StubLlm {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        _safety: &'a [SafetySetting],
    ) -> Pin<Box<dyn Future<Output = Result<LlmReply, LlmError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let out = match &self.behavior {
            LlmBehavior::Text(t) => Ok(LlmReply::Text(t.clone())),
            LlmBehavior::Blocked(c) => Ok(LlmReply::Blocked {
                candidate_text: c.clone(),
            }),
            LlmBehavior::Fail => Err(LlmError::Status {
                status: 500,
                body: "upstream exploded".into(),
            }),
        };
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

// ---------------------------------------------------------------- news

pub struct StubNews {
    payload: Option<NewsPayload>,
    pub queries: Mutex<Vec<NewsQuery>>,
}

impl StubNews {
    pub fn json(raw: &str) -> Arc<Self> {
        Arc::new(Self {
            payload: Some(serde_json::from_str(raw).expect("stub payload")),
            queries: Mutex::new(Vec::new()),
        })
    }

    /// Every search fails with HTTP 500.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            payload: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::json(r#"{"status":"ok","totalResults":0,"articles":[]}"#)
    }
}

#[async_trait]
impl NewsSearch for StubNews {
    async fn search(&self, query: &NewsQuery) -> Result<NewsPayload, FetchError> {
        self.queries.lock().unwrap().push(query.clone());
        self.payload.clone().ok_or(FetchError::Status(500))
    }
    fn name(&self) -> &'static str {
        "stub-news"
    }
}

pub fn three_articles() -> Arc<StubNews> {
    StubNews::json(
        r#"{"status":"ok","totalResults":3,"articles":[
            {"title":"Stocks rally as earnings beat","description":"Bullish session across sectors.","source":{"name":"Reuters"},"publishedAt":"2024-03-15T10:00:00Z","url":"https://news.test/1"},
            {"title":"Bank shares slip","description":"Recession fears weigh on lenders.","source":{"name":"CNBC"},"publishedAt":"2024-03-15T11:00:00Z","url":"https://news.test/2"},
            {"title":"Oil steady","description":"Crude flat ahead of inventory data.","source":{"name":"Bloomberg"},"publishedAt":"2024-03-15T12:00:00Z","url":"https://news.test/3"}
        ]}"#,
    )
}

// ---------------------------------------------------------------- discussion

#[derive(Default)]
pub struct StubDiscussion {
    pub posts: HashMap<String, Vec<RawPost>>,
    pub failing_communities: HashSet<String>,
    pub failing_replies: HashSet<String>,
    pub replies: HashMap<String, Vec<RawReply>>,
    pub searched: Mutex<Vec<(String, String)>>,
}

impl StubDiscussion {
    pub fn searched(&self) -> Vec<(String, String)> {
        self.searched.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscussionSearch for StubDiscussion {
    async fn search(
        &self,
        community: &str,
        query: &str,
        _recency: RecencyBucket,
        limit: usize,
    ) -> Result<Vec<RawPost>, FetchError> {
        self.searched
            .lock()
            .unwrap()
            .push((community.to_string(), query.to_string()));
        if self.failing_communities.contains(community) {
            return Err(FetchError::Status(503));
        }
        Ok(self
            .posts
            .get(community)
            .map(|p| p.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn top_replies(&self, post: &RawPost, _limit: usize) -> Result<Vec<RawReply>, FetchError> {
        if self.failing_replies.contains(&post.id) {
            return Err(FetchError::Malformed("replies unavailable".into()));
        }
        Ok(self.replies.get(&post.id).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "stub-discussion"
    }
}

/// 2024-03-15 12:00:00 UTC
pub const MAR_15_2024: i64 = 1_710_504_000;

pub fn post(id: &str, title: &str, body: &str, score: i64, created_utc: i64) -> RawPost {
    RawPost {
        id: id.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        score,
        num_comments: 4,
        created_utc,
        url: format!("https://forum.test/{id}"),
        flair: None,
    }
}

pub fn reply(body: &str, score: i64) -> RawReply {
    RawReply {
        body: body.to_string(),
        score,
    }
}

/// Two core communities and one general one, vocabulary from the built-in catalog.
pub fn small_catalog() -> SourcesCatalog {
    SourcesCatalog {
        communities: vec!["stocks".into(), "investing".into(), "technology".into()],
        core_communities: vec!["stocks".into(), "investing".into()],
        finance_terms: SourcesCatalog::builtin().finance_terms,
    }
}

pub fn no_delay() -> DiscussionSettings {
    DiscussionSettings {
        delay: Duration::ZERO,
        ..DiscussionSettings::default()
    }
}

pub fn generator(
    daily: Arc<StubNews>,
    topic: Arc<StubNews>,
    discussion: Arc<StubDiscussion>,
    llm: Arc<StubLlm>,
) -> InsightGenerator {
    InsightGenerator::new(
        NewsFetcher::new(daily),
        NewsFetcher::new(topic),
        DiscussionFetcher::new(discussion, small_catalog(), no_delay()),
        llm,
    )
}

// ---------------------------------------------------------------- mail + subscribers

#[derive(Default)]
pub struct StubMailer {
    pub fail_for: HashSet<String>,
    pub sent: Mutex<Vec<(String, DigestEmail)>>,
    pub attempts: AtomicUsize,
}

impl StubMailer {
    pub fn failing_for(addr: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_for: HashSet::from([addr.to_string()]),
            ..Self::default()
        })
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }
}

#[async_trait]
impl MailTransport for StubMailer {
    async fn send(&self, email: &DigestEmail, recipient: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.contains(recipient) {
            return Err(anyhow!("relay rejected {recipient}"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), email.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    set: Mutex<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn with(addrs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            set: Mutex::new(addrs.iter().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn read(&self) -> Result<BTreeSet<String>> {
        Ok(self.set.lock().unwrap().clone())
    }

    async fn add(&self, email: &str) -> Result<bool> {
        if !email.contains('@') {
            return Err(anyhow!("invalid email address"));
        }
        Ok(self.set.lock().unwrap().insert(email.to_string()))
    }
}
