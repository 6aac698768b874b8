//! News fetchers: one search call, payload normalization, date filter.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use metrics::counter;

use crate::dates::{parse_date, start_of_day, DateBounds, RecencyBucket};
use crate::ingest::types::{
    Article, FetchError, NewsPayload, NewsQuery, NewsSearch, NormalizedRecord,
};
use crate::ingest::{ensure_metrics_described, normalize_text, truncate_chars};
use crate::sentiment::SentimentAnalyzer;

pub const DESCRIPTION_MAX_CHARS: usize = 400;

/// Convert either payload shape into common articles.
/// Error payloads become `Err`; an ok payload with no results is `Ok(vec![])`.
pub fn normalize_payload(payload: NewsPayload) -> Result<Vec<Article>, FetchError> {
    match payload {
        NewsPayload::Error { error } => Err(FetchError::Api {
            code: "error".to_string(),
            message: error,
        }),
        NewsPayload::Articles {
            status,
            code,
            message,
            ..
        } if !status.eq_ignore_ascii_case("ok") => Err(FetchError::Api {
            code: code.unwrap_or_else(|| "Unknown".to_string()),
            message: message.unwrap_or_else(|| "Unknown API error".to_string()),
        }),
        NewsPayload::Articles {
            total_results,
            articles,
            ..
        } => {
            if total_results == 0 {
                return Ok(Vec::new());
            }
            Ok(articles
                .into_iter()
                .map(|a| Article {
                    title: a.title.unwrap_or_default(),
                    description: a.description.unwrap_or_default(),
                    source_name: a
                        .source
                        .and_then(|s| s.name)
                        .unwrap_or_else(|| "Unknown".to_string()),
                    published_at: a.published_at.unwrap_or_default(),
                    url: a.url.unwrap_or_default(),
                })
                .collect())
        }
        NewsPayload::Results { news_results } => Ok(news_results
            .into_iter()
            .map(|r| Article {
                title: r.title.unwrap_or_default(),
                description: r.snippet.unwrap_or_default(),
                source_name: r
                    .source
                    .as_ref()
                    .and_then(|s| s.name())
                    .unwrap_or("Unknown")
                    .to_string(),
                published_at: r.date.unwrap_or_default(),
                url: r.link.unwrap_or_default(),
            })
            .collect()),
    }
}

/// Single-line description: newlines folded, provider truncation marker
/// (`" [+123 chars]"`) dropped, capped at [`DESCRIPTION_MAX_CHARS`].
pub fn clean_description(raw: &str) -> String {
    let one_line = raw.replace("\r\n", " ").replace('\n', " ");
    let head = one_line.split(" [+").next().unwrap_or_default();
    truncate_chars(&normalize_text(head), DESCRIPTION_MAX_CHARS)
}

/// Best-effort timestamp for an article date string.
pub fn article_time(published_at: &str) -> Option<NaiveDateTime> {
    let s = published_at.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Some(head) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(head, "%m/%d/%Y") {
            return Some(start_of_day(d));
        }
    }
    let date_part = s.split(',').next().unwrap_or(s);
    parse_date(date_part).map(start_of_day)
}

pub struct NewsFetcher {
    search: Arc<dyn NewsSearch>,
    analyzer: SentimentAnalyzer,
}

impl NewsFetcher {
    pub fn new(search: Arc<dyn NewsSearch>) -> Self {
        Self {
            search,
            analyzer: SentimentAnalyzer::new(),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.search.name()
    }

    /// One search call. Failures and empty results both come back as `None`;
    /// the difference is visible in the logs only.
    pub async fn fetch(&self, query: &NewsQuery, bounds: DateBounds) -> Option<Vec<NormalizedRecord>> {
        ensure_metrics_described();
        let provider = self.search.name();

        let articles = match self.search.search(query).await.and_then(normalize_payload) {
            Ok(a) => a,
            Err(e) => {
                counter!("fetch_source_errors_total").increment(1);
                tracing::warn!(provider, kind = e.kind(), error = %e, "news search failed");
                return None;
            }
        };
        counter!("fetch_attempts_total").increment(articles.len() as u64);

        let records: Vec<NormalizedRecord> = articles
            .into_iter()
            .filter(|a| !a.title.trim().is_empty())
            .filter(|a| match article_time(&a.published_at) {
                Some(ts) => bounds.contains(ts),
                None => true,
            })
            .map(|a| self.to_record(a))
            .collect();

        if records.is_empty() {
            tracing::info!(provider, query = query.q.as_str(), "no news data found");
            return None;
        }

        counter!("fetch_records_total").increment(records.len() as u64);
        tracing::info!(provider, count = records.len(), "news articles fetched");
        Some(records)
    }

    fn to_record(&self, a: Article) -> NormalizedRecord {
        let title = normalize_text(&a.title);
        let description = clean_description(&a.description);
        let sentiment = self.analyzer.score_text(&format!("{title} {description}"));
        let published = if a.published_at.trim().is_empty() {
            "N/A".to_string()
        } else {
            a.published_at.trim().to_string()
        };
        let llm_text = format!(
            "Title: {title}\nSource: {}\nTime: {published}\nSummary: {description}",
            a.source_name
        );
        NormalizedRecord {
            title,
            body_preview: description,
            source_label: a.source_name,
            published_at: published,
            engagement_score: None,
            comment_count: None,
            flair: None,
            sentiment,
            url: a.url,
            llm_text,
        }
    }
}

/// Broad "today's market" search.
pub fn daily_market_query(today: NaiveDate, num_results: u32) -> NewsQuery {
    NewsQuery {
        q: format!(
            "stock market today {} financial markets trading earnings economic news S&P 500 Dow Jones NASDAQ",
            today.format("%Y-%m-%d")
        ),
        from: None,
        to: None,
        page_size: num_results,
        recency: Some(RecencyBucket::Day),
    }
}

/// Topic search over `[from, to]`, defaulting to the `lookback_days` before `today`.
pub fn topic_query(
    topic: &str,
    bounds: &DateBounds,
    today: NaiveDate,
    lookback_days: i64,
    page_size: u32,
) -> NewsQuery {
    let to = bounds.end.map(|d| d.date()).unwrap_or(today);
    let from = bounds
        .start
        .map(|d| d.date())
        .unwrap_or_else(|| to - chrono::Duration::days(lookback_days));
    NewsQuery {
        q: topic.trim().to_string(),
        from: Some(from),
        to: Some(to),
        page_size,
        recency: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> NewsPayload {
        serde_json::from_str(json).expect("payload")
    }

    #[test]
    fn results_shape_normalizes() {
        let p = payload(
            r#"{"news_results":[{"title":"Stocks rally","snippet":"Dow up","source":"Reuters","date":"2 hours ago","link":"https://x.test/a"},
                                {"title":"Bonds","source":{"name":"FT"}}]}"#,
        );
        let a = normalize_payload(p).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].source_name, "Reuters");
        assert_eq!(a[0].description, "Dow up");
        assert_eq!(a[1].source_name, "FT");
        assert_eq!(a[1].url, "");
    }

    #[test]
    fn articles_shape_normalizes_and_error_status_fails() {
        let ok = payload(
            r#"{"status":"ok","totalResults":1,"articles":[{"title":"T","description":"D","source":{"name":"CNBC"},"publishedAt":"2024-03-15T10:00:00Z","url":"u"}]}"#,
        );
        let a = normalize_payload(ok).unwrap();
        assert_eq!(a[0].source_name, "CNBC");
        assert_eq!(a[0].published_at, "2024-03-15T10:00:00Z");

        let empty = payload(r#"{"status":"ok","totalResults":0,"articles":[]}"#);
        assert!(normalize_payload(empty).unwrap().is_empty());

        let err = payload(r#"{"status":"error","code":"apiKeyInvalid","message":"bad key"}"#);
        match normalize_payload(err) {
            Err(FetchError::Api { code, .. }) => assert_eq!(code, "apiKeyInvalid"),
            other => panic!("unexpected {other:?}"),
        }

        let explicit = payload(r#"{"error":"Invalid API key"}"#);
        assert!(matches!(normalize_payload(explicit), Err(FetchError::Api { .. })));
    }

    #[test]
    fn description_cleanup() {
        let d = clean_description("Line one\r\nline two [+1234 chars]");
        assert_eq!(d, "Line one line two");
        assert_eq!(clean_description(&"y".repeat(900)).chars().count(), 400);
    }

    #[test]
    fn article_time_formats() {
        assert!(article_time("2024-03-15T10:00:00Z").is_some());
        assert_eq!(
            article_time("03/15/2024, 10:00 AM, +0000 UTC").map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(article_time("2 hours ago"), None);
        assert_eq!(article_time(""), None);
    }

    #[test]
    fn topic_query_defaults_to_lookback() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let q = topic_query(" Tesla ", &DateBounds::default(), today, 7, 25);
        assert_eq!(q.q, "Tesla");
        assert_eq!(q.from, NaiveDate::from_ymd_opt(2024, 3, 8));
        assert_eq!(q.to, Some(today));
    }
}
