//! Insight generation: fetch, score, format, ask the LLM, package the result.
pub mod prompts;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::dates::DateBounds;
use crate::ingest::discussion::{DiscussionFetcher, DiscussionReport, DiscussionSettings};
use crate::ingest::news::{daily_market_query, topic_query, NewsFetcher};
use crate::ingest::NormalizedRecord;
use crate::llm::{self, DynLlmClient};
use crate::prompt::format_records;
use crate::sentiment::mean_sentiment;

pub const FORMAT_FAILED: &str = "Could not format articles for analysis.";
pub const DISCLAIMER: &str = "This is NOT financial advice. AI-generated summaries of public news and discussion data may be incomplete, inaccurate or biased. Always do your own research before making financial decisions.";

const DAILY_RESULTS: u32 = 40;
const DAILY_PROMPT_RECORDS: usize = 35;
const DAILY_TOP: usize = 10;
const TOPIC_PAGE_SIZE: u32 = 25;
const TOPIC_LOOKBACK_DAYS: i64 = 7;
const TOPIC_PROMPT_RECORDS: usize = 25;
const TOPIC_TOP: usize = 7;
const DISCUSSION_LIMIT: usize = 30;
const DISCUSSION_MIN_SCORE: i64 = 1;
const DISCUSSION_PROMPT_RECORDS: usize = 50;
const DISCUSSION_PROMPT_CHARS: usize = 1000;
const DISCUSSION_TOP: usize = 10;
/// News `llm_text` is already bounded by the description cap.
const NEWS_PROMPT_CHARS: usize = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    DailySummary,
    TopicSearch,
    DiscussionSentiment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    pub status: InsightStatus,
    pub kind: InsightKind,
    pub query_or_date: String,
    pub article_count: usize,
    pub sentiment_score: f64,
    pub analysis_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub top_records: Vec<NormalizedRecord>,
}

impl InsightResult {
    pub fn is_success(&self) -> bool {
        self.status == InsightStatus::Success
    }

    fn failed(kind: InsightKind, query_or_date: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(?kind, message = message.as_str(), "insight not generated");
        Self {
            status: InsightStatus::Error,
            kind,
            query_or_date: query_or_date.into(),
            article_count: 0,
            sentiment_score: 0.0,
            analysis_text: String::new(),
            message: Some(message),
            top_records: Vec::new(),
        }
    }
}

/// Prompt parameters shared by all three modes.
struct Analysis<'a> {
    kind: InsightKind,
    query_or_date: String,
    records: &'a [NormalizedRecord],
    max_records: usize,
    max_chars: usize,
    top: usize,
}

pub struct InsightGenerator {
    daily_news: NewsFetcher,
    topic_news: NewsFetcher,
    discussion: DiscussionFetcher,
    llm: DynLlmClient,
}

impl InsightGenerator {
    pub fn new(
        daily_news: NewsFetcher,
        topic_news: NewsFetcher,
        discussion: DiscussionFetcher,
        llm: DynLlmClient,
    ) -> Self {
        let base = discussion.settings().clone();
        let discussion = discussion.with_settings(DiscussionSettings {
            limit: DISCUSSION_LIMIT,
            min_score: DISCUSSION_MIN_SCORE,
            ..base
        });
        Self {
            daily_news,
            topic_news,
            discussion,
            llm,
        }
    }

    pub fn discussion_fetcher(&self) -> &DiscussionFetcher {
        &self.discussion
    }

    /// Market-wide digest of the past day's news.
    pub async fn daily_summary(&self, today: NaiveDate) -> InsightResult {
        let date = today.format("%B %d, %Y").to_string();
        let query = daily_market_query(today, DAILY_RESULTS);
        let Some(records) = self.daily_news.fetch(&query, DateBounds::default()).await else {
            return InsightResult::failed(
                InsightKind::DailySummary,
                date,
                format!(
                    "Could not retrieve today's market news. Please check the {} connection.",
                    self.daily_news.provider()
                ),
            );
        };
        self.analyze(
            Analysis {
                kind: InsightKind::DailySummary,
                query_or_date: date.clone(),
                records: &records,
                max_records: DAILY_PROMPT_RECORDS,
                max_chars: NEWS_PROMPT_CHARS,
                top: DAILY_TOP,
            },
            |block, s| prompts::daily(&date, s, block),
        )
        .await
    }

    /// Digest of recent news about one topic; the window defaults to the past week.
    pub async fn topic_insights(&self, query: &str, bounds: DateBounds) -> InsightResult {
        let query = query.trim();
        if query.is_empty() {
            return InsightResult::failed(InsightKind::TopicSearch, "", "Please enter a topic.");
        }
        let today = Local::now().date_naive();
        let news_query = topic_query(query, &bounds, today, TOPIC_LOOKBACK_DAYS, TOPIC_PAGE_SIZE);
        let Some(records) = self.topic_news.fetch(&news_query, bounds).await else {
            return InsightResult::failed(
                InsightKind::TopicSearch,
                query,
                format!("Could not retrieve articles for '{query}'. Please try a different search term."),
            );
        };
        self.analyze(
            Analysis {
                kind: InsightKind::TopicSearch,
                query_or_date: query.to_string(),
                records: &records,
                max_records: TOPIC_PROMPT_RECORDS,
                max_chars: NEWS_PROMPT_CHARS,
                top: TOPIC_TOP,
            },
            |block, s| prompts::topic(query, s, block),
        )
        .await
    }

    /// Digest of community discussion about `query` between optional dates.
    pub async fn discussion_insights(
        &self,
        query: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> (InsightResult, DiscussionReport) {
        self.discussion_insights_at(query, start, end, Local::now().naive_local())
            .await
    }

    pub async fn discussion_insights_at(
        &self,
        query: &str,
        start: Option<&str>,
        end: Option<&str>,
        now: NaiveDateTime,
    ) -> (InsightResult, DiscussionReport) {
        let query = query.trim();
        if query.is_empty() {
            return (
                InsightResult::failed(InsightKind::DiscussionSentiment, "", "Please enter a topic."),
                DiscussionReport::default(),
            );
        }
        let bounds = DateBounds::from_inputs(start, end, now);
        let period = bounds.describe();
        let report = self.discussion.fetch(query, bounds, now).await;

        if report.records.is_empty() {
            let result = InsightResult::failed(
                InsightKind::DiscussionSentiment,
                query,
                format!("No relevant discussion posts found for '{query}' {period}."),
            );
            return (result, report);
        }

        let result = self
            .analyze(
                Analysis {
                    kind: InsightKind::DiscussionSentiment,
                    query_or_date: query.to_string(),
                    records: &report.records,
                    max_records: DISCUSSION_PROMPT_RECORDS,
                    max_chars: DISCUSSION_PROMPT_CHARS,
                    top: DISCUSSION_TOP,
                },
                |block, s| prompts::discussion(query, &period, s, block),
            )
            .await;
        (result, report)
    }

    async fn analyze(
        &self,
        a: Analysis<'_>,
        build_prompt: impl FnOnce(&str, f64) -> String,
    ) -> InsightResult {
        let block = format_records(a.records, a.max_records, a.max_chars);
        if block.is_empty() {
            return InsightResult::failed(a.kind, a.query_or_date, FORMAT_FAILED);
        }
        let sentiment = mean_sentiment(a.records.iter().map(|r| r.sentiment));
        let prompt = build_prompt(&block, sentiment);

        let (status, analysis_text, message) = match llm::complete(self.llm.as_ref(), &prompt).await {
            Ok(text) => (InsightStatus::Success, text, None),
            Err(e) => {
                let text = format!("Error during LLM analysis: {e}");
                (InsightStatus::Error, text.clone(), Some(text))
            }
        };

        tracing::info!(kind = ?a.kind, records = a.records.len(), sentiment, ?status, "insight generated");
        InsightResult {
            status,
            kind: a.kind,
            query_or_date: a.query_or_date,
            article_count: a.records.len(),
            sentiment_score: sentiment,
            analysis_text,
            message,
            top_records: a.records.iter().take(a.top).cloned().collect(),
        }
    }
}

/// Plain-text rendering for the terminal surface.
pub fn render_terminal(result: &InsightResult) -> String {
    if !result.is_success() {
        return format!(
            "Error: {}\n",
            result.message.as_deref().unwrap_or("insight could not be generated")
        );
    }

    let rule = "=".repeat(100);
    let thin = "-".repeat(100);
    let mut out = String::new();
    out.push_str(&format!("\n{rule}\n"));
    let (header, label) = match result.kind {
        InsightKind::DailySummary => (format!("DAILY MARKET SUMMARY - {}", result.query_or_date), "articles"),
        InsightKind::TopicSearch => (format!("TOPIC ANALYSIS: {}", result.query_or_date.to_uppercase()), "articles"),
        InsightKind::DiscussionSentiment => (
            format!("DISCUSSION INSIGHTS: '{}'", result.query_or_date),
            "discussion posts",
        ),
    };
    out.push_str(&format!("{header}\n{rule}\n"));
    out.push_str(&format!(
        "\nAnalyzed {} {label} | Sentiment: {:.2}\n{thin}\n",
        result.article_count, result.sentiment_score
    ));
    out.push_str(&format!("\nAI ANALYSIS:\n{thin}\n{}\n{thin}\n", result.analysis_text));

    out.push_str(&format!("\nTOP SOURCES FOR REFERENCE:\n{thin}\n"));
    if result.top_records.is_empty() {
        out.push_str("  (No records available)\n");
    }
    for (i, r) in result.top_records.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, r.title));
        out.push_str(&format!("   {} | {}\n", r.source_label, r.published_at));
        if !r.url.is_empty() {
            out.push_str(&format!("   {}\n", r.url));
        }
        out.push('\n');
    }
    out.push_str(&format!("{rule}\n\n*** DISCLAIMER ***\n{DISCLAIMER}\n"));
    out
}
