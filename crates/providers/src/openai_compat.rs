//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Ollama, vLLM, LM Studio, Together, and any other
//! endpoint that follows the OpenAI chat completions contract.

use serde_json::Value;

use sr_domain::config::LlmConfig;
use sr_domain::error::CompletionError;
use sr_domain::WindowEntry;

use crate::traits::{CompletionBackend, CompletionRequest};
use crate::util::{classify_status, clip_reply, from_reqwest, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A completion backend for any OpenAI-compatible chat endpoint.
pub struct OpenAiCompatBackend {
    base_url: String,
    model: String,
    /// `None` means every call fails with `Unauthorized`.
    api_key: Option<String>,
    max_reply_chars: usize,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Create a backend from the `[llm]` config section.
    ///
    /// A missing API key does not fail construction: the backend is still
    /// built and reports `Unauthorized` per call, so the orchestrator falls
    /// back instead of the process refusing to start.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = resolve_api_key(cfg);
        if api_key.is_none() {
            tracing::warn!(
                env_var = %cfg.api_key_env,
                "no API key configured; completions will fail until one is set"
            );
        }

        // Per-request timeouts come from the request; this is only a
        // connect bound.
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key,
            max_reply_chars: cfg.max_reply_chars,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // ── Internal: build the JSON body ─────────────────────────────

    fn build_chat_body(&self, req: &CompletionRequest) -> Value {
        let mut messages: Vec<Value> = Vec::with_capacity(req.messages.len() + 1);
        if !req.system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": req.system_prompt,
            }));
        }
        messages.extend(req.messages.iter().map(entry_to_openai));

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": req.temperature,
            "max_tokens": req.max_tokens,
        })
    }
}

fn entry_to_openai(entry: &WindowEntry) -> Value {
    serde_json::json!({
        "role": entry.role.as_str(),
        "content": entry.content,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_chat_response(body: &Value) -> Result<String, CompletionError> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".into()))?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| CompletionError::MalformedResponse("no message content in choice".into()))?;

    if content.trim().is_empty() {
        return Err(CompletionError::MalformedResponse("empty message content".into()));
    }
    Ok(content.to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl CompletionBackend for OpenAiCompatBackend {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::Unauthorized("no API key configured".into()))?;

        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(req);

        tracing::debug!(url = %url, model = %self.model, entries = req.messages.len(), "openai_compat chat request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(key)
            .timeout(req.timeout)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &resp_text));
        }

        let resp_json: Value = serde_json::from_str(&resp_text)
            .map_err(|e| CompletionError::MalformedResponse(format!("invalid JSON body: {e}")))?;
        let content = parse_chat_response(&resp_json)?;
        Ok(clip_reply(&content, self.max_reply_chars))
    }

    fn backend_id(&self) -> &str {
        "openai_compat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn backend() -> OpenAiCompatBackend {
        OpenAiCompatBackend::from_config(&LlmConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn body_puts_system_prompt_first() {
        let req = CompletionRequest {
            system_prompt: "be kind".into(),
            messages: vec![WindowEntry::user("hi"), WindowEntry::assistant("hello")],
            max_tokens: 300,
            temperature: 0.7,
            timeout: Duration::from_secs(5),
        };
        let body = backend().build_chat_body(&req);
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 300);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["role"], "assistant");
    }

    #[test]
    fn parses_first_choice() {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "That sounds hard." } }]
        });
        assert_eq!(parse_chat_response(&body).unwrap(), "That sounds hard.");
    }

    #[test]
    fn missing_choices_is_malformed() {
        let err = parse_chat_response(&serde_json::json!({ "choices": [] })).unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn blank_content_is_malformed() {
        let body = serde_json::json!({ "choices": [{ "message": { "content": "  " } }] });
        assert!(matches!(parse_chat_response(&body), Err(CompletionError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn missing_key_fails_unauthorized() {
        let b = OpenAiCompatBackend::from_config(&LlmConfig {
            api_key_env: "SR_TEST_NO_SUCH_KEY_4242".into(),
            ..Default::default()
        })
        .unwrap();
        let req = CompletionRequest {
            system_prompt: String::new(),
            messages: vec![WindowEntry::user("hi")],
            max_tokens: 10,
            temperature: 0.0,
            timeout: Duration::from_secs(1),
        };
        assert!(matches!(b.complete(&req).await, Err(CompletionError::Unauthorized(_))));
    }
}
