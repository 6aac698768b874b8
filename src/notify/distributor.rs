//! Subscriber fan-out: render once, send to each address in turn.
use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

use super::email::MailTransport;
use super::render::render_digest;
use super::subscribers::SubscriberStore;
use crate::insight::InsightResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub recipient: String,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn attempts(&self) -> usize {
        self.outcomes.len()
    }
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered).count()
    }
    pub fn failed(&self) -> usize {
        self.attempts() - self.delivered()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DistributeError {
    #[error("insight is not deliverable: {0}")]
    NotDeliverable(String),
    #[error("cannot read subscribers: {0:#}")]
    Subscribers(anyhow::Error),
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_delivered_total", "Digest emails accepted by the mail relay.");
        describe_counter!("digest_failed_total", "Digest emails that could not be sent.");
    });
}

pub struct Distributor {
    subscribers: Arc<dyn SubscriberStore>,
    mailer: Arc<dyn MailTransport>,
}

impl Distributor {
    pub fn new(subscribers: Arc<dyn SubscriberStore>, mailer: Arc<dyn MailTransport>) -> Self {
        Self {
            subscribers,
            mailer,
        }
    }

    /// Send a successful insight to every subscriber. Individual send
    /// failures are recorded in the report, never retried.
    pub async fn distribute(&self, insight: &InsightResult) -> Result<DeliveryReport, DistributeError> {
        if !insight.is_success() {
            return Err(DistributeError::NotDeliverable(
                insight
                    .message
                    .clone()
                    .unwrap_or_else(|| "insight generation failed".to_string()),
            ));
        }
        let recipients = self
            .subscribers
            .read()
            .await
            .map_err(DistributeError::Subscribers)?;
        if recipients.is_empty() {
            tracing::info!("no active subscribers");
            return Ok(DeliveryReport::default());
        }
        Ok(self.send_all(insight, recipients.iter().map(String::as_str)).await)
    }

    /// Send to one address regardless of the subscriber list.
    pub async fn send_to(&self, insight: &InsightResult, recipient: &str) -> Result<DeliveryReport, DistributeError> {
        if !insight.is_success() {
            return Err(DistributeError::NotDeliverable(
                insight.message.clone().unwrap_or_default(),
            ));
        }
        Ok(self.send_all(insight, std::iter::once(recipient)).await)
    }

    async fn send_all<'a>(
        &self,
        insight: &InsightResult,
        recipients: impl Iterator<Item = &'a str>,
    ) -> DeliveryReport {
        ensure_metrics_described();
        let email = render_digest(insight);
        let mut report = DeliveryReport::default();

        for recipient in recipients {
            let outcome = match self.mailer.send(&email, recipient).await {
                Ok(()) => {
                    counter!("digest_delivered_total").increment(1);
                    tracing::info!(recipient, "digest sent");
                    DeliveryOutcome {
                        recipient: recipient.to_string(),
                        delivered: true,
                        error: None,
                    }
                }
                Err(e) => {
                    counter!("digest_failed_total").increment(1);
                    tracing::warn!(recipient, error = ?e, "digest send failed");
                    DeliveryOutcome {
                        recipient: recipient.to_string(),
                        delivered: false,
                        error: Some(format!("{e:#}")),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        tracing::info!(
            attempts = report.attempts(),
            delivered = report.delivered(),
            failed = report.failed(),
            "digest distribution finished"
        );
        report
    }
}
