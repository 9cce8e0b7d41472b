//! Offline backend that answers every request with a fixed reply after a
//! short delay.  Useful for demos and local runs without credentials.

use std::time::Duration;

use sr_domain::config::LlmConfig;
use sr_domain::error::CompletionError;

use crate::traits::{CompletionBackend, CompletionRequest};
use crate::util::clip_reply;

pub struct CannedBackend {
    reply: String,
    delay: Duration,
}

impl CannedBackend {
    pub fn new(reply: impl Into<String>, delay: Duration) -> Self {
        Self {
            reply: reply.into(),
            delay,
        }
    }

    pub fn from_config(cfg: &LlmConfig) -> Self {
        Self::new(
            clip_reply(&cfg.canned_reply, cfg.max_reply_chars),
            Duration::from_millis(cfg.canned_delay_ms),
        )
    }
}

#[async_trait::async_trait]
impl CompletionBackend for CannedBackend {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
        if self.delay >= req.timeout {
            tokio::time::sleep(req.timeout).await;
            return Err(CompletionError::Timeout(format!(
                "canned reply delay {:?} exceeds timeout {:?}",
                self.delay, req.timeout
            )));
        }
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }

    fn backend_id(&self) -> &str {
        "canned"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_domain::WindowEntry;

    fn request(timeout_ms: u64) -> CompletionRequest {
        CompletionRequest {
            system_prompt: String::new(),
            messages: vec![WindowEntry::user("hello")],
            max_tokens: 300,
            temperature: 0.7,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn replies_after_delay() {
        let backend = CannedBackend::from_config(&LlmConfig::default());
        let started = tokio::time::Instant::now();
        let reply = backend.complete(&request(20_000)).await.unwrap();
        assert_eq!(reply, "I'm here to support you. How can I help you today?");
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_beyond_timeout_times_out() {
        let backend = CannedBackend::new("late", Duration::from_secs(5));
        let err = backend.complete(&request(100)).await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
    }
}
