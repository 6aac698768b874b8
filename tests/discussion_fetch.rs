// tests/discussion_fetch.rs
//
// Discussion fetcher against an in-memory search collaborator:
// filtering, reply handling, failure isolation and ordering.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::*;
use market_intel::dates::DateBounds;
use market_intel::ingest::discussion::DiscussionFetcher;
use market_intel::ingest::JournalLevel;
use market_intel::sentiment;

fn now() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 20)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn fetcher(stub: Arc<StubDiscussion>) -> DiscussionFetcher {
    DiscussionFetcher::new(stub, small_catalog(), no_delay())
}

#[tokio::test]
async fn on_topic_post_kept_and_off_topic_general_post_dropped() {
    let mut stub = StubDiscussion::default();
    stub.posts.insert(
        "stocks".into(),
        vec![post("p1", "AAPL earnings beat", "Strong quarter, buying more", 5, MAR_15_2024)],
    );
    stub.posts.insert(
        "technology".into(),
        vec![post("p2", "AAPL launches a new gadget", "Nice design though", 50, MAR_15_2024)],
    );
    stub.replies.insert(
        "p1".into(),
        vec![reply("Great rally today", 10), reply("meh", 1)],
    );
    let stub = Arc::new(stub);

    let report = fetcher(stub.clone())
        .fetch("AAPL", DateBounds::default(), now())
        .await;

    assert_eq!(report.records.len(), 1, "only the finance post survives");
    let rec = &report.records[0];
    assert_eq!(rec.source_label, "stocks");
    assert_eq!(rec.engagement_score, Some(5));
    assert_eq!(rec.published_at, "2024-03-15");

    // Sentiment covers title, body and the one reply above the score floor.
    let expected = sentiment::score("AAPL earnings beat. Strong quarter, buying more Great rally today");
    assert!((rec.sentiment - (expected * 1000.0).round() / 1000.0).abs() < 1e-9);
    assert!(rec.sentiment > 0.0);

    assert_eq!(report.attempts, 2);
    assert_eq!(report.per_source.get("stocks"), Some(&1));
    assert!(!report.per_source.contains_key("technology"));

    // Every community searched once with the quoted keyword.
    let searched = stub.searched();
    assert_eq!(searched.len(), 3);
    assert!(searched.iter().all(|(_, q)| q == "\"AAPL\""));
}

#[tokio::test]
async fn low_score_and_keyword_misses_are_dropped() {
    let mut stub = StubDiscussion::default();
    stub.posts.insert(
        "stocks".into(),
        vec![
            post("low", "AAPL dip", "", 1, MAR_15_2024),
            post("miss", "Market wrap", "Nothing about the ticker", 40, MAR_15_2024),
            post("multi", "Apple Inc results", "apple quarterly inc update", 9, MAR_15_2024),
        ],
    );
    let report = fetcher(Arc::new(stub))
        .fetch("Apple Inc", DateBounds::default(), now())
        .await;
    let ids: Vec<_> = report.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(ids, vec!["https://forum.test/multi"]);
}

#[tokio::test]
async fn failing_community_is_logged_and_iteration_continues() {
    let mut stub = StubDiscussion::default();
    stub.failing_communities.insert("stocks".into());
    stub.posts.insert(
        "investing".into(),
        vec![post("ok", "AAPL dividend talk", "", 3, MAR_15_2024)],
    );
    let stub = Arc::new(stub);
    let report = fetcher(stub.clone())
        .fetch("AAPL", DateBounds::default(), now())
        .await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(stub.searched().len(), 3);
    assert_eq!(report.journal.warnings(), 1);
    assert!(report
        .journal
        .entries()
        .iter()
        .any(|e| e.level == JournalLevel::Warn && e.message.contains("stocks")));
}

#[tokio::test]
async fn reply_failure_keeps_post_without_replies() {
    let mut stub = StubDiscussion::default();
    stub.posts.insert(
        "stocks".into(),
        vec![post("p1", "TSLA crash incoming", "bearish", 7, MAR_15_2024)],
    );
    stub.failing_replies.insert("p1".into());
    let report = fetcher(Arc::new(stub))
        .fetch("TSLA", DateBounds::default(), now())
        .await;

    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].sentiment < 0.0);
    assert_eq!(report.journal.warnings(), 1);
}

#[tokio::test]
async fn date_window_and_ordering() {
    let day = 86_400;
    let mut stub = StubDiscussion::default();
    stub.posts.insert(
        "stocks".into(),
        vec![
            post("old", "NVDA stock", "", 5, MAR_15_2024 - 30 * day),
            post("a", "NVDA stock up", "", 5, MAR_15_2024 - day),
            post("b", "NVDA stock flat", "", 5, MAR_15_2024 + day),
        ],
    );
    let bounds = DateBounds::from_inputs(Some("2024-03-10"), Some("2024-03-18"), now());
    let report = fetcher(Arc::new(stub)).fetch("NVDA", bounds, now()).await;

    let dates: Vec<_> = report.records.iter().map(|r| r.published_at.as_str()).collect();
    assert_eq!(dates, vec!["2024-03-16", "2024-03-14"], "newest first, old post outside window");
    assert_eq!(report.earliest.as_deref(), Some("2024-03-14"));
    assert_eq!(report.latest.as_deref(), Some("2024-03-16"));
}

#[tokio::test]
async fn replies_capped_filtered_and_truncated_before_scoring() {
    let long = format!("{}collapse and bankruptcy", "x ".repeat(100));
    assert!(long.chars().count() > 200);
    let mut stub = StubDiscussion::default();
    stub.posts.insert(
        "stocks".into(),
        vec![post("p1", "AAPL earnings beat", "", 5, MAR_15_2024)],
    );
    stub.replies.insert(
        "p1".into(),
        vec![
            reply("Great rally today", 10),
            reply(&long, 5),
            reply("recession default bankruptcy", 1),
            reply("total crash incoming", 50),
        ],
    );

    let report = fetcher(Arc::new(stub))
        .fetch("AAPL", DateBounds::default(), now())
        .await;
    assert_eq!(report.records.len(), 1);

    // First three replies only, the score-1 one dropped, the long one cut at 200 chars.
    let kept: String = long.chars().take(200).collect();
    let input = format!("AAPL earnings beat.  Great rally today {kept}");
    let expected = (sentiment::score(input.as_str()) * 1000.0).round() / 1000.0;
    assert!((report.records[0].sentiment - expected).abs() < 1e-9);

    let uncapped = sentiment::score(format!(
        "AAPL earnings beat.  Great rally today {long} total crash incoming"
    ).as_str());
    assert!((report.records[0].sentiment - uncapped).abs() > 1e-3);
}
