use serde::Serialize;

/// What a window build kept and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    /// Transcript messages offered to the builder.
    pub available: usize,
    /// Prior messages included in the window.
    pub included: usize,
    /// Older messages left out because of the limit.
    pub dropped: usize,
    pub system_prompt_chars: usize,
    /// Characters across every entry, system prompt included.
    pub total_chars: usize,
}
