//! Shared utility functions for backend adapters.

use sr_domain::config::LlmConfig;
use sr_domain::error::CompletionError;

/// Convert a transport-level [`reqwest::Error`] into a [`CompletionError`].
///
/// Timeouts map to `Timeout`, body decoding failures to
/// `MalformedResponse`, and everything else (connect, reset, DNS) to
/// `Unavailable`.
pub(crate) fn from_reqwest(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(e.to_string())
    } else if e.is_decode() {
        CompletionError::MalformedResponse(e.to_string())
    } else {
        CompletionError::Unavailable(e.to_string())
    }
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn classify_status(status: u16, body: &str) -> CompletionError {
    let detail = format!("HTTP {status} - {}", snippet(body));
    match status {
        401 | 403 => CompletionError::Unauthorized(detail),
        429 => CompletionError::RateLimited(detail),
        408 | 504 => CompletionError::Timeout(detail),
        500..=599 => CompletionError::Unavailable(detail),
        _ => CompletionError::MalformedResponse(detail),
    }
}

/// Resolve the API key.
///
/// Precedence:
/// 1. the environment variable named by `api_key_env`
/// 2. `api_key` field (plaintext, warned)
///
/// Returns `None` when neither is set.
pub fn resolve_api_key(cfg: &LlmConfig) -> Option<String> {
    if let Ok(val) = std::env::var(&cfg.api_key_env) {
        if !val.trim().is_empty() {
            return Some(val);
        }
    }

    let key = cfg.api_key.clone()?;
    tracing::warn!(
        env = %cfg.api_key_env,
        "API key loaded from plaintext config field 'api_key'; \
         prefer 'api_key_env' instead"
    );
    Some(key)
}

/// Trim surrounding whitespace and cut to at most `max_chars` characters.
pub fn clip_reply(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_owned(),
        None => trimmed.to_owned(),
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(401, "").kind(), "unauthorized");
        assert_eq!(classify_status(403, "").kind(), "unauthorized");
        assert_eq!(classify_status(429, "slow down").kind(), "rate_limited");
        assert_eq!(classify_status(503, "").kind(), "unavailable");
        assert_eq!(classify_status(504, "").kind(), "timeout");
        assert_eq!(classify_status(400, "bad").kind(), "malformed_response");
    }

    #[test]
    fn status_detail_is_bounded() {
        let body = "x".repeat(5000);
        let err = classify_status(500, &body);
        assert!(err.to_string().len() < 300);
    }

    #[test]
    fn clip_reply_trims_and_caps() {
        assert_eq!(clip_reply("  hello  ", 100), "hello");
        assert_eq!(clip_reply("abcdef", 3), "abc");
        assert_eq!(clip_reply("héllo wörld", 7), "héllo w");
    }

    #[test]
    fn resolve_api_key_plaintext_is_fallback() {
        let cfg = LlmConfig {
            api_key: Some("sk-test-123".into()),
            api_key_env: "SR_TEST_NONEXISTENT_VAR_7777".into(),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&cfg).as_deref(), Some("sk-test-123"));
    }

    #[test]
    fn resolve_api_key_env_beats_plaintext() {
        let var_name = "SR_TEST_RESOLVE_ENV_OVER_PLAINTEXT_5678";
        std::env::set_var(var_name, "env-secret-value");
        let cfg = LlmConfig {
            api_key: Some("sk-plaintext".into()),
            api_key_env: var_name.into(),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&cfg).as_deref(), Some("env-secret-value"));
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_blank_env_falls_back() {
        let var_name = "SR_TEST_RESOLVE_BLANK_ENV_9012";
        std::env::set_var(var_name, "   ");
        let cfg = LlmConfig {
            api_key: Some("sk-plaintext".into()),
            api_key_env: var_name.into(),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&cfg).as_deref(), Some("sk-plaintext"));
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_env_var() {
        let var_name = "SR_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let cfg = LlmConfig {
            api_key_env: var_name.into(),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&cfg).as_deref(), Some("env-secret-value"));
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_missing() {
        let cfg = LlmConfig {
            api_key_env: "SR_TEST_NONEXISTENT_VAR_8888".into(),
            ..Default::default()
        };
        assert!(resolve_api_key(&cfg).is_none());
    }
}
