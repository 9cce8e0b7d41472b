use sr_domain::config::ContextConfig;
use sr_domain::{Message, WindowEntry};

use crate::persona::DEFAULT_SYSTEM_PROMPT;
use crate::report::WindowReport;

/// Prior messages sent with each request unless configured otherwise.
pub const DEFAULT_LIMIT: usize = 10;

/// Deterministic context window builder.
///
/// Pure: accepts an already reconciled transcript and returns the
/// role-tagged window plus a machine-readable report.  No I/O.
#[derive(Debug, Clone)]
pub struct ContextWindowBuilder {
    limit: usize,
    system_prompt: String,
}

impl ContextWindowBuilder {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }

    pub fn from_config(cfg: &ContextConfig) -> Self {
        let builder = Self::new(cfg.limit);
        match cfg.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => builder.with_system_prompt(prompt),
            _ => builder,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the window for `new_utterance`.
    ///
    /// - `transcript`: prior messages in visible order (oldest first), not
    ///   including the utterance itself
    /// - `new_utterance`: appended as the trailing `user` entry
    ///
    /// The window is the system entry, then the last `limit` transcript
    /// messages oldest first, then the utterance.
    pub fn build(&self, transcript: &[Message], new_utterance: &str) -> (Vec<WindowEntry>, WindowReport) {
        let start = transcript.len().saturating_sub(self.limit);
        let recent = &transcript[start..];

        let mut window = Vec::with_capacity(recent.len() + 2);
        window.push(WindowEntry::system(self.system_prompt.as_str()));
        window.extend(recent.iter().map(|m| WindowEntry {
            role: m.sender.into(),
            content: m.text.clone(),
        }));
        window.push(WindowEntry::user(new_utterance));

        let report = WindowReport {
            available: transcript.len(),
            included: recent.len(),
            dropped: start,
            system_prompt_chars: self.system_prompt.len(),
            total_chars: window.iter().map(|e| e.content.len()).sum(),
        };

        tracing::debug!(
            included = report.included,
            dropped = report.dropped,
            total_chars = report.total_chars,
            "context window built"
        );

        (window, report)
    }
}

impl Default for ContextWindowBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

/// Build a window with the built-in persona prompt.
pub fn build(transcript: &[Message], new_utterance: &str, limit: usize) -> Vec<WindowEntry> {
    ContextWindowBuilder::new(limit).build(transcript, new_utterance).0
}
