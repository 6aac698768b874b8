//! Discussion fetcher: searches every configured community for a keyword,
//! filters by date, engagement and topicality, pulls a few top replies and
//! scores each surviving post.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::dates::DateBounds;
use crate::ingest::config::SourcesCatalog;
use crate::ingest::types::{DiscussionSearch, NormalizedRecord, RawPost};
use crate::ingest::{ensure_metrics_described, preview, truncate_chars, Journal};
use crate::sentiment::SentimentAnalyzer;

#[derive(Debug, Clone)]
pub struct DiscussionSettings {
    /// Results requested per community.
    pub limit: usize,
    /// Posts scoring below this are dropped.
    pub min_score: i64,
    pub reply_limit: usize,
    /// Replies must score strictly above this.
    pub reply_min_score: i64,
    pub reply_max_chars: usize,
    pub preview_chars: usize,
    pub sentiment_body_chars: usize,
    /// Pause between community searches.
    pub delay: Duration,
}

impl Default for DiscussionSettings {
    fn default() -> Self {
        Self {
            limit: 15,
            min_score: 2,
            reply_limit: 3,
            reply_min_score: 1,
            reply_max_chars: 200,
            preview_chars: 300,
            sentiment_body_chars: 500,
            delay: Duration::from_millis(100),
        }
    }
}

/// Output of one discussion fetch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscussionReport {
    /// Newest first.
    pub records: Vec<NormalizedRecord>,
    /// Raw items inspected across all searches.
    pub attempts: usize,
    pub per_source: BTreeMap<String, usize>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub journal: Journal,
}

impl DiscussionReport {
    /// The most active communities, highest count first.
    pub fn most_active(&self, n: usize) -> Vec<(&str, usize)> {
        let mut v: Vec<(&str, usize)> = self
            .per_source
            .iter()
            .map(|(k, c)| (k.as_str(), *c))
            .collect();
        v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        v.truncate(n);
        v
    }
}

pub struct DiscussionFetcher {
    search: Arc<dyn DiscussionSearch>,
    catalog: SourcesCatalog,
    settings: DiscussionSettings,
    analyzer: SentimentAnalyzer,
}

impl DiscussionFetcher {
    pub fn new(
        search: Arc<dyn DiscussionSearch>,
        catalog: SourcesCatalog,
        settings: DiscussionSettings,
    ) -> Self {
        Self {
            search,
            catalog,
            settings,
            analyzer: SentimentAnalyzer::new(),
        }
    }

    pub fn settings(&self) -> &DiscussionSettings {
        &self.settings
    }

    pub fn with_settings(mut self, settings: DiscussionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Search all communities. A failing community is logged and skipped.
    pub async fn fetch(
        &self,
        keyword: &str,
        bounds: DateBounds,
        now: NaiveDateTime,
    ) -> DiscussionReport {
        ensure_metrics_described();

        let mut report = DiscussionReport::default();
        let keyword = keyword.trim();
        let recency = bounds.recency(now);

        report.journal.info(format!("Discussion posts on: '{keyword}'"));
        report.journal.info(match (bounds.start, bounds.end) {
            (Some(_), _) => format!("Time range: {} ({recency})", bounds.describe()),
            _ => format!("Time range: past {recency} (default)"),
        });

        let quoted = format!("\"{keyword}\"");
        let mut matched_dates: Vec<NaiveDateTime> = Vec::new();

        for (i, community) in self.catalog.communities.iter().enumerate() {
            if i > 0 && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }

            let posts = match self
                .search
                .search(community, &quoted, recency, self.settings.limit)
                .await
            {
                Ok(posts) => posts,
                Err(e) => {
                    counter!("fetch_source_errors_total").increment(1);
                    tracing::warn!(
                        provider = self.search.name(),
                        community = community.as_str(),
                        kind = e.kind(),
                        error = %e,
                        "community search failed"
                    );
                    report
                        .journal
                        .warn(format!("Error searching {community}: {e}"));
                    continue;
                }
            };

            let mut kept_here = 0usize;
            for post in posts {
                report.attempts += 1;
                counter!("fetch_attempts_total").increment(1);

                let Some(posted) = post_time(&post) else {
                    continue;
                };
                if !bounds.contains(posted) {
                    continue;
                }
                matched_dates.push(posted);

                if !self.passes_quality(community, keyword, &post) {
                    continue;
                }

                let record = self.build_record(community, &post, posted, &mut report.journal).await;
                report.records.push(record);
                *report.per_source.entry(community.clone()).or_insert(0) += 1;
                kept_here += 1;
            }

            if kept_here > 0 {
                report
                    .journal
                    .info(format!("Found {kept_here} relevant posts in {community}."));
            }
        }

        report
            .records
            .sort_by(|a, b| b.published_at.cmp(&a.published_at));
        counter!("fetch_records_total").increment(report.records.len() as u64);

        report.earliest = matched_dates
            .iter()
            .min()
            .map(|d| d.format("%Y-%m-%d").to_string());
        report.latest = matched_dates
            .iter()
            .max()
            .map(|d| d.format("%Y-%m-%d").to_string());

        report.journal.info(format!(
            "Processed ~{} posts. Found {} relevant results.",
            report.attempts,
            report.records.len()
        ));
        if let (Some(e), Some(l)) = (&report.earliest, &report.latest) {
            report
                .journal
                .info(format!("Posts actual date range found: {e} to {l}"));
        }
        if !report.records.is_empty() {
            let top = report
                .most_active(5)
                .into_iter()
                .map(|(c, n)| format!("{c} ({n})"))
                .collect::<Vec<_>>()
                .join(", ");
            report.journal.info(format!("Most active communities: {top}"));
        }

        report
    }

    /// Engagement, keyword and topicality checks.
    fn passes_quality(&self, community: &str, keyword: &str, post: &RawPost) -> bool {
        if post.score < self.settings.min_score {
            return false;
        }
        let content = format!("{} {}", post.title, post.body).to_lowercase();
        if !matches_keyword(&content, keyword) {
            return false;
        }
        self.catalog.is_core(community) || self.catalog.has_finance_term(&content)
    }

    async fn build_record(
        &self,
        community: &str,
        post: &RawPost,
        posted: NaiveDateTime,
        journal: &mut Journal,
    ) -> NormalizedRecord {
        let mut replies: Vec<String> = Vec::new();
        match self.search.top_replies(post, self.settings.reply_limit).await {
            Ok(list) => {
                replies = list
                    .into_iter()
                    .take(self.settings.reply_limit)
                    .filter(|r| r.score > self.settings.reply_min_score)
                    .map(|r| truncate_chars(&r.body, self.settings.reply_max_chars))
                    .collect();
            }
            Err(e) => {
                tracing::warn!(post_id = post.id.as_str(), kind = e.kind(), error = %e, "reply fetch failed");
                journal.warn(format!("Could not fetch replies for post {}: {e}", post.id));
            }
        }

        let body_for_sentiment = truncate_chars(&post.body, self.settings.sentiment_body_chars);
        let sentiment_input = format!("{}. {} {}", post.title, body_for_sentiment, replies.join(" "));
        let sentiment = (self.analyzer.score_text(&sentiment_input) * 1000.0).round() / 1000.0;

        let date = posted.format("%Y-%m-%d").to_string();
        let llm_text = format!(
            "Title: {}\nCommunity: {}\nDate: {}\nScore: {}\nComments: {}\nSentiment: {:.2}\nPreview: {}...",
            post.title, community, date, post.score, post.num_comments, sentiment, body_for_sentiment
        );

        NormalizedRecord {
            title: post.title.clone(),
            body_preview: preview(&post.body, self.settings.preview_chars),
            source_label: community.to_string(),
            published_at: date,
            engagement_score: Some(post.score),
            comment_count: Some(post.num_comments),
            flair: post.flair.clone(),
            sentiment: sentiment.clamp(-1.0, 1.0),
            url: post.url.clone(),
            llm_text,
        }
    }
}

fn post_time(post: &RawPost) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp(post.created_utc, 0).map(|d| d.naive_utc())
}

/// Whole keyword as a substring, or every word of a multi-word keyword.
pub fn matches_keyword(lower_content: &str, keyword: &str) -> bool {
    let kw = keyword.to_lowercase();
    if lower_content.contains(kw.as_str()) {
        return true;
    }
    let mut parts = kw.split_whitespace().peekable();
    parts.peek().is_some() && parts.all(|p| lower_content.contains(p))
}
