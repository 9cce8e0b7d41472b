mod context;
mod llm;
mod observability;
mod safety;
mod server;
mod sessions;

pub use context::*;
pub use llm::*;
pub use observability::*;
pub use safety::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: &str, message: &str) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: &str) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.allowed_origins.iter().any(|o| o == "*") {
            errors.push(ConfigError::warning(
                "server.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        if self.llm.timeout_ms == 0 {
            errors.push(ConfigError::error("llm.timeout_ms", "completion timeout must be greater than 0"));
        }
        if self.llm.max_tokens == 0 {
            errors.push(ConfigError::error("llm.max_tokens", "max_tokens must be greater than 0"));
        }
        if self.llm.max_reply_chars == 0 {
            errors.push(ConfigError::error("llm.max_reply_chars", "max_reply_chars must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            errors.push(ConfigError::error("llm.temperature", "temperature must be within 0.0 to 2.0"));
        }
        if self.llm.kind == BackendKind::OpenaiCompat {
            if self.llm.base_url.is_empty() {
                errors.push(ConfigError::error("llm.base_url", "base_url must not be empty"));
            }
            if self.llm.api_key.is_some() {
                errors.push(ConfigError::warning(
                    "llm.api_key",
                    "plaintext API key in config; prefer llm.api_key_env",
                ));
            }
        }
        if self.llm.kind == BackendKind::Canned && self.llm.canned_reply.trim().is_empty() {
            errors.push(ConfigError::error("llm.canned_reply", "canned reply must not be blank"));
        }

        if self.context.limit == 0 {
            errors.push(ConfigError::warning(
                "context.limit",
                "limit 0 sends no conversation history with each request",
            ));
        }

        if !self.safety.phrases.is_empty() && self.safety.phrase_list_version.is_none() {
            errors.push(ConfigError::warning(
                "safety.phrase_list_version",
                "custom phrase list has no version label",
            ));
        }
        if self
            .safety
            .phrases
            .iter()
            .chain(&self.safety.extra_phrases)
            .any(|p| p.trim().is_empty())
        {
            errors.push(ConfigError::error("safety.phrases", "crisis phrases must not be blank"));
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "sample rate must be within 0.0 to 1.0",
            ));
        }

        if self.sessions.subscription_buffer == 0 {
            errors.push(ConfigError::error(
                "sessions.subscription_buffer",
                "subscription buffer must be greater than 0",
            ));
        }

        errors
    }
}
