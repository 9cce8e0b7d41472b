use std::time::Duration;

use sr_domain::error::CompletionError;
use sr_domain::WindowEntry;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A backend-agnostic completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    /// Conversation entries after the system prompt, oldest first.
    pub messages: Vec<WindowEntry>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    pub temperature: f32,
    /// Hard deadline for the whole request.
    pub timeout: Duration,
}

impl CompletionRequest {
    /// Split a built window into system prompt and conversation.  A window
    /// without a leading system entry gets an empty prompt.
    pub fn from_window(window: Vec<WindowEntry>, max_tokens: u32, temperature: f32, timeout: Duration) -> Self {
        let mut messages = window;
        let system_prompt = match messages.first() {
            Some(first) if first.role == sr_domain::Role::System => messages.remove(0).content,
            _ => String::new(),
        };
        Self {
            system_prompt,
            messages,
            max_tokens,
            temperature,
            timeout,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core backend trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Single request/response text completion.
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError>;

    /// A short identifier for logs.
    fn backend_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_window_lifts_system_entry() {
        let window = vec![
            WindowEntry::system("be kind"),
            WindowEntry::user("hi"),
        ];
        let req = CompletionRequest::from_window(window, 300, 0.7, Duration::from_secs(5));
        assert_eq!(req.system_prompt, "be kind");
        assert_eq!(req.messages, vec![WindowEntry::user("hi")]);
    }

    #[test]
    fn from_window_without_system_entry() {
        let req = CompletionRequest::from_window(vec![WindowEntry::user("hi")], 300, 0.7, Duration::from_secs(5));
        assert!(req.system_prompt.is_empty());
        assert_eq!(req.messages.len(), 1);
    }
}
