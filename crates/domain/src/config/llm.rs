use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Completion backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Any endpoint following the OpenAI chat completions contract.
    #[default]
    OpenaiCompat,
    /// Offline responder that always returns `canned_reply`.
    Canned,
}

/// What to do with a reply that arrives after the cycle already fell back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateReplyPolicy {
    /// Log and drop it; the transcript keeps only the fallback.
    #[default]
    Suppress,
    /// Append it as a second assistant message.
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Plaintext key, used only when `api_key_env` is unset.  Prefer the env var.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_300")]
    pub max_tokens: u32,
    /// Hard cap on reply length, applied after the backend returns.
    #[serde(default = "d_2000")]
    pub max_reply_chars: usize,
    #[serde(default = "d_20000u")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "d_500u")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub late_reply: LateReplyPolicy,
    #[serde(default = "d_canned_reply")]
    pub canned_reply: String,
    #[serde(default = "d_1000u")]
    pub canned_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::OpenaiCompat,
            base_url: d_base_url(),
            model: d_model(),
            api_key_env: d_api_key_env(),
            api_key: None,
            temperature: d_temperature(),
            max_tokens: 300,
            max_reply_chars: 2000,
            timeout_ms: 20_000,
            max_retries: 0,
            retry_backoff_ms: 500,
            late_reply: LateReplyPolicy::Suppress,
            canned_reply: d_canned_reply(),
            canned_delay_ms: 1000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_model() -> String {
    "gpt-3.5-turbo".into()
}
fn d_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn d_temperature() -> f32 {
    0.7
}
fn d_300() -> u32 {
    300
}
fn d_2000() -> usize {
    2000
}
fn d_20000u() -> u64 {
    20_000
}
fn d_500u() -> u64 {
    500
}
fn d_1000u() -> u64 {
    1000
}
fn d_canned_reply() -> String {
    "I'm here to support you. How can I help you today?".into()
}
