//! Gemini `generateContent` over REST.
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{LlmClient, LlmError, LlmReply, SafetySetting};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .user_agent(crate::ingest::providers::USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key,
            model,
            base_url: API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    contents: [Content<'a>; 1],
    safety_settings: &'a [SafetySetting],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [PartOut<'a>; 1],
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Deserialize)]
struct PartIn {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Map a decoded response onto [`LlmReply`].
pub(crate) fn interpret(resp: Resp) -> LlmReply {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        tracing::warn!(reason = reason.as_str(), "prompt blocked by provider");
        return LlmReply::Blocked {
            candidate_text: None,
        };
    }
    let Some(first) = resp.candidates.into_iter().next() else {
        return LlmReply::Blocked {
            candidate_text: None,
        };
    };
    let text: String = first
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    let safety_stop = first.finish_reason.as_deref() == Some("SAFETY");

    if !safety_stop && !text.trim().is_empty() {
        LlmReply::Text(text)
    } else {
        LlmReply::Blocked {
            candidate_text: Some(text).filter(|t| !t.trim().is_empty()),
        }
    }
}

impl LlmClient for GeminiProvider {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        safety: &'a [SafetySetting],
    ) -> Pin<Box<dyn Future<Output = Result<LlmReply, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            let req = Req {
                contents: [Content {
                    parts: [PartOut { text: prompt }],
                }],
                safety_settings: safety,
            };
            let resp = self
                .http
                .post(self.endpoint())
                .query(&[("key", self.api_key.as_str())])
                .json(&req)
                .send()
                .await?;

            let status = resp.status();
            let body = resp.text().await?;
            if !status.is_success() {
                return Err(LlmError::Status {
                    status: status.as_u16(),
                    body: crate::ingest::truncate_chars(&body, 300),
                });
            }
            let parsed: Resp =
                serde_json::from_str(&body).map_err(|e| LlmError::Malformed(e.to_string()))?;
            Ok(interpret(parsed))
        })
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(json: &str) -> Resp {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn text_reply() {
        let r = resp(r#"{"candidates":[{"content":{"parts":[{"text":"Markets "},{"text":"rose."}]},"finishReason":"STOP"}]}"#);
        assert_eq!(interpret(r), LlmReply::Text("Markets rose.".into()));
    }

    #[test]
    fn safety_stop_keeps_candidate_text() {
        let r = resp(r#"{"candidates":[{"content":{"parts":[{"text":"partial"}]},"finishReason":"SAFETY"}]}"#);
        assert_eq!(
            interpret(r),
            LlmReply::Blocked {
                candidate_text: Some("partial".into())
            }
        );
    }

    #[test]
    fn blocked_prompt_and_empty_candidates() {
        let r = resp(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert_eq!(interpret(r), LlmReply::Blocked { candidate_text: None });
        let r = resp(r#"{"candidates":[]}"#);
        assert_eq!(interpret(r), LlmReply::Blocked { candidate_text: None });
    }

    #[test]
    fn request_body_shape() {
        let req = Req {
            contents: [Content {
                parts: [PartOut { text: "hi" }],
            }],
            safety_settings: &super::super::DEFAULT_SAFETY,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(v["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn endpoint_uses_model() {
        let p = GeminiProvider::new("k".into(), "gemini-1.5-flash".into(), Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:1");
        assert_eq!(p.endpoint(), "http://localhost:1/models/gemini-1.5-flash:generateContent");
    }
}
