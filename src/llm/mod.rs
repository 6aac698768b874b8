//! LLM adapter: provider abstraction, safety settings and the reply contract
//! the insight generator relies on.

pub mod gemini;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::llm::LlmConfig;

pub use gemini::GeminiProvider;

/// Returned when a reply is blocked and carries no usable candidate text.
pub const BLOCKED_FALLBACK: &str =
    "LLM analysis could not be generated (possibly due to safety filters).";

pub const BLOCK_MEDIUM_AND_ABOVE: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

/// Sent with every request.
pub const DEFAULT_SAFETY: [SafetySetting; 4] = [
    SafetySetting {
        category: "HARM_CATEGORY_HARASSMENT",
        threshold: BLOCK_MEDIUM_AND_ABOVE,
    },
    SafetySetting {
        category: "HARM_CATEGORY_HATE_SPEECH",
        threshold: BLOCK_MEDIUM_AND_ABOVE,
    },
    SafetySetting {
        category: "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        threshold: BLOCK_MEDIUM_AND_ABOVE,
    },
    SafetySetting {
        category: "HARM_CATEGORY_DANGEROUS_CONTENT",
        threshold: BLOCK_MEDIUM_AND_ABOVE,
    },
];

/// What a provider hands back for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmReply {
    Text(String),
    /// Safety-filtered or empty. `candidate_text` is the first candidate's
    /// text when the provider still returned one.
    Blocked { candidate_text: Option<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("LLM is disabled")]
    Disabled,
}

pub trait LlmClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        safety: &'a [SafetySetting],
    ) -> Pin<Box<dyn Future<Output = Result<LlmReply, LlmError>> + Send + 'a>>;
    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynLlmClient = Arc<dyn LlmClient>;

/// Always fails with [`LlmError::Disabled`]; used when `enabled=false`.
pub struct DisabledClient;

impl LlmClient for DisabledClient {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _safety: &'a [SafetySetting],
    ) -> Pin<Box<dyn Future<Output = Result<LlmReply, LlmError>> + Send + 'a>> {
        Box::pin(async { Err(LlmError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Build the client described by the config.
pub fn build_client(cfg: &LlmConfig) -> Result<DynLlmClient, LlmError> {
    if !cfg.enabled {
        tracing::warn!("LLM disabled in config; insights will report an error");
        return Ok(Arc::new(DisabledClient));
    }
    match cfg.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(
            cfg.api_key.clone(),
            cfg.model.clone(),
            cfg.timeout(),
        )?)),
        other => {
            tracing::warn!(provider = other, "unsupported LLM provider; using disabled client");
            Ok(Arc::new(DisabledClient))
        }
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("llm_requests_total", "Prompts sent to the LLM provider.");
        describe_counter!(
            "llm_blocked_total",
            "Replies that were safety-filtered or empty."
        );
    });
}

/// Send `prompt` with [`DEFAULT_SAFETY`] and reduce the reply to display text.
///
/// Blocked replies fall back to the first candidate's text, then to
/// [`BLOCKED_FALLBACK`]. Transport and API failures are returned as `Err`.
pub async fn complete(client: &dyn LlmClient, prompt: &str) -> Result<String, LlmError> {
    ensure_metrics_described();
    counter!("llm_requests_total").increment(1);
    tracing::info!(provider = client.provider_name(), prompt_chars = prompt.len(), "generating LLM analysis");

    let reply = client.generate(prompt, &DEFAULT_SAFETY).await.map_err(|e| {
        tracing::error!(provider = client.provider_name(), error = %e, "LLM generation failed");
        e
    })?;

    let candidate = match reply {
        LlmReply::Text(t) if !t.trim().is_empty() => return Ok(t.trim().to_string()),
        LlmReply::Text(_) => None,
        LlmReply::Blocked { candidate_text } => candidate_text,
    };
    counter!("llm_blocked_total").increment(1);
    match candidate.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(t) => Ok(t),
        None => {
            tracing::warn!(provider = client.provider_name(), "LLM reply blocked or empty");
            Ok(BLOCKED_FALLBACK.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<LlmReply, ()>);

    impl LlmClient for Fixed {
        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
            safety: &'a [SafetySetting],
        ) -> Pin<Box<dyn Future<Output = Result<LlmReply, LlmError>> + Send + 'a>> {
            assert_eq!(safety.len(), 4);
            let out = self.0.clone().map_err(|_| LlmError::Malformed("boom".into()));
            Box::pin(async move { out })
        }
        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn text_is_trimmed() {
        let c = Fixed(Ok(LlmReply::Text("  hello\n".into())));
        assert_eq!(complete(&c, "p").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn blocked_uses_candidate_then_sentinel() {
        let with = Fixed(Ok(LlmReply::Blocked {
            candidate_text: Some(" partial ".into()),
        }));
        assert_eq!(complete(&with, "p").await.unwrap(), "partial");

        let without = Fixed(Ok(LlmReply::Blocked {
            candidate_text: None,
        }));
        assert_eq!(complete(&without, "p").await.unwrap(), BLOCKED_FALLBACK);

        let empty = Fixed(Ok(LlmReply::Text("   ".into())));
        assert_eq!(complete(&empty, "p").await.unwrap(), BLOCKED_FALLBACK);
    }

    #[tokio::test]
    async fn errors_propagate() {
        let c = Fixed(Err(()));
        assert!(complete(&c, "p").await.is_err());
        assert!(matches!(
            complete(&DisabledClient, "p").await,
            Err(LlmError::Disabled)
        ));
    }

    #[test]
    fn safety_settings_block_medium_and_above() {
        assert!(DEFAULT_SAFETY
            .iter()
            .all(|s| s.threshold == "BLOCK_MEDIUM_AND_ABOVE"));
        let json = serde_json::to_value(DEFAULT_SAFETY[1]).unwrap();
        assert_eq!(json["category"], "HARM_CATEGORY_HATE_SPEECH");
    }
}
