use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::dates::DateBounds;
use crate::ingest::JournalEntry;
use crate::insight::{InsightGenerator, InsightResult};
use crate::notify::subscribers::is_valid_email;
use crate::notify::{DeliveryReport, DistributeError, Distributor, SubscriberStore};

#[derive(Clone)]
pub struct AppState {
    pub insights: Arc<InsightGenerator>,
    pub subscribers: Arc<dyn SubscriberStore>,
    /// `None` when no mail transport is configured.
    pub distributor: Option<Arc<Distributor>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unavailable(&'static str),
    #[error("{0}")]
    Upstream(String),
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match &self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<DistributeError> for ApiError {
    fn from(e: DistributeError) -> Self {
        match e {
            DistributeError::NotDeliverable(msg) => ApiError::Upstream(msg),
            DistributeError::Subscribers(e) => ApiError::Internal(e),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/daily", post(daily))
        .route("/api/topic", post(topic))
        .route("/api/discussion", post(discussion))
        .route("/api/subscribe", post(subscribe))
        .route("/api/send-summary", post(send_summary))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct QueryReq {
    pub query: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl QueryReq {
    fn validated(&self) -> Result<&str, ApiError> {
        let q = self.query.trim();
        if q.is_empty() {
            return Err(ApiError::Validation("query must not be empty".into()));
        }
        Ok(q)
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailReq {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct DiscussionResp {
    pub insight: InsightResult,
    pub attempts: usize,
    pub most_active: Vec<(String, usize)>,
    pub journal: Vec<JournalEntry>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResp {
    pub subscribed: bool,
    pub message: String,
}

async fn daily(State(state): State<AppState>) -> Json<InsightResult> {
    Json(state.insights.daily_summary(Local::now().date_naive()).await)
}

async fn topic(
    State(state): State<AppState>,
    Json(body): Json<QueryReq>,
) -> Result<Json<InsightResult>, ApiError> {
    let query = body.validated()?;
    let bounds = DateBounds::from_inputs(
        body.start.as_deref(),
        body.end.as_deref(),
        Local::now().naive_local(),
    );
    Ok(Json(state.insights.topic_insights(query, bounds).await))
}

async fn discussion(
    State(state): State<AppState>,
    Json(body): Json<QueryReq>,
) -> Result<Json<DiscussionResp>, ApiError> {
    let query = body.validated()?;
    let (insight, report) = state
        .insights
        .discussion_insights(query, body.start.as_deref(), body.end.as_deref())
        .await;
    Ok(Json(DiscussionResp {
        insight,
        attempts: report.attempts,
        most_active: report
            .most_active(5)
            .into_iter()
            .map(|(k, n)| (k.to_string(), n))
            .collect(),
        journal: report.journal.entries().to_vec(),
    }))
}

async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<EmailReq>,
) -> Result<Json<SubscribeResp>, ApiError> {
    let email = body.email.trim();
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Please enter a valid email address.".into()));
    }
    let added = state.subscribers.add(email).await.map_err(ApiError::Internal)?;
    let message = if added {
        format!("Subscribed {email} to the daily digest.")
    } else {
        format!("{email} is already subscribed.")
    };
    Ok(Json(SubscribeResp {
        subscribed: added,
        message,
    }))
}

async fn send_summary(
    State(state): State<AppState>,
    Json(body): Json<EmailReq>,
) -> Result<Json<DeliveryReport>, ApiError> {
    let email = body.email.trim();
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Please enter a valid email address.".into()));
    }
    let distributor = state
        .distributor
        .as_ref()
        .ok_or(ApiError::Unavailable("email delivery is not configured"))?;

    let insight = state.insights.daily_summary(Local::now().date_naive()).await;
    let report = distributor.send_to(&insight, email).await?;
    if report.delivered() == 0 {
        let reason = report
            .outcomes
            .first()
            .and_then(|o| o.error.clone())
            .unwrap_or_else(|| "send failed".to_string());
        return Err(ApiError::Upstream(reason));
    }
    Ok(Json(report))
}
