// tests/distributor.rs
//
// Subscriber fan-out: per-recipient outcomes, refusal of failed insights.

mod common;

use common::*;
use market_intel::insight::{InsightKind, InsightResult, InsightStatus};
use market_intel::notify::{DistributeError, Distributor};

fn insight(status: InsightStatus) -> InsightResult {
    InsightResult {
        status,
        kind: InsightKind::DailySummary,
        query_or_date: "March 15, 2024".into(),
        article_count: 12,
        sentiment_score: 0.1234,
        analysis_text: "MARKET OVERVIEW:\nStocks rose.".into(),
        message: None,
        top_records: Vec::new(),
    }
}

#[tokio::test]
async fn one_failed_send_does_not_stop_the_batch() {
    let store = MemoryStore::with(&["a@x.test", "b@x.test", "c@x.test"]);
    let mailer = StubMailer::failing_for("b@x.test");
    let d = Distributor::new(store, mailer.clone());

    let report = d.distribute(&insight(InsightStatus::Success)).await.unwrap();
    assert_eq!(report.attempts(), 3);
    assert_eq!(report.delivered(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(mailer.attempts.load(std::sync::atomic::Ordering::SeqCst), 3);

    let failed: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| !o.delivered)
        .map(|o| o.recipient.as_str())
        .collect();
    assert_eq!(failed, vec!["b@x.test"]);
    assert!(report.outcomes[1].error.as_deref().unwrap().contains("relay rejected"));
    assert_eq!(mailer.sent_to(), vec!["a@x.test", "c@x.test"]);
}

#[tokio::test]
async fn every_recipient_gets_the_same_rendered_email() {
    let store = MemoryStore::with(&["a@x.test", "b@x.test"]);
    let mailer = std::sync::Arc::new(StubMailer::default());
    let d = Distributor::new(store, mailer.clone());
    d.distribute(&insight(InsightStatus::Success)).await.unwrap();

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1, sent[1].1);
    assert!(sent[0].1.subject.contains("March 15, 2024"));
    assert!(sent[0].1.html.contains("0.12"));
}

#[tokio::test]
async fn no_subscribers_is_an_empty_report() {
    let mailer = std::sync::Arc::new(StubMailer::default());
    let d = Distributor::new(MemoryStore::with(&[]), mailer.clone());
    let report = d.distribute(&insight(InsightStatus::Success)).await.unwrap();
    assert_eq!(report.attempts(), 0);
    assert!(mailer.sent_to().is_empty());
}

#[tokio::test]
async fn error_insight_is_not_deliverable() {
    let mailer = std::sync::Arc::new(StubMailer::default());
    let d = Distributor::new(MemoryStore::with(&["a@x.test"]), mailer.clone());
    let mut bad = insight(InsightStatus::Error);
    bad.message = Some("no news".into());

    match d.distribute(&bad).await {
        Err(DistributeError::NotDeliverable(msg)) => assert_eq!(msg, "no news"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(mailer.attempts.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn send_to_single_address() {
    let mailer = std::sync::Arc::new(StubMailer::default());
    let d = Distributor::new(MemoryStore::with(&["a@x.test"]), mailer.clone());
    let report = d
        .send_to(&insight(InsightStatus::Success), "me@x.test")
        .await
        .unwrap();
    assert_eq!(report.delivered(), 1);
    assert_eq!(mailer.sent_to(), vec!["me@x.test"]);
}
