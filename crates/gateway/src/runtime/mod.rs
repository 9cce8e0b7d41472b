//! Core runtime: the conversation orchestrator that ties the transcript
//! store, crisis screening, context windows and the completion backend into
//! one cycle per user utterance.
//!
//! Entry point: [`Orchestrator::submit`] stores the utterance and returns a
//! [`CycleHandle`] that resolves to the [`CycleOutcome`].

pub mod feed;
pub mod observer;
pub mod orchestrator;
pub mod session_lock;

use serde::Serialize;

use sr_domain::Message;
use sr_safety::CrisisSignal;

pub use feed::TranscriptFeed;
pub use observer::{ConversationObserver, LoggingObserver, ObserverSet};
pub use orchestrator::{CycleHandle, CycleSettings, Orchestrator};

/// Appended in place of a reply whenever the completion backend fails.
pub const FALLBACK_MESSAGE: &str =
    "I'm sorry, I'm having trouble connecting right now. Please try again in a moment.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why a submit was refused.  None of these leave anything in the
/// transcript.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message text is empty")]
    EmptyInput,

    #[error("session is busy: a reply is already in progress")]
    SessionBusy,

    #[error("transcript store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Why an erase was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EraseError {
    #[error("session is busy: wait for the reply before erasing")]
    SessionBusy,

    #[error("transcript store unavailable: {0}")]
    StoreUnavailable(String),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cycle state & outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where a session's current cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Submitting,
    AwaitingCompletion,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    /// The backend reply was appended.
    Resolved,
    /// The fallback message was appended after a backend failure.
    FallbackResolved { kind: String },
    /// Neither reply nor fallback could be stored.
    Abandoned,
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Resolved => "resolved",
            Resolution::FallbackResolved { .. } => "fallback_resolved",
            Resolution::Abandoned => "abandoned",
        }
    }
}

/// Everything one submit produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub user_message: Message,
    /// The terminal assistant message; `None` only when abandoned.
    pub reply: Option<Message>,
    #[serde(flatten)]
    pub resolution: Resolution,
    pub crisis: CrisisSignal,
}
