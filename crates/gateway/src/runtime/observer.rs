//! Observer callbacks on cycle transitions.
//!
//! Presentation state (typing indicators, crisis banners) lives in the
//! observers themselves.  Callbacks run synchronously on the cycle's task,
//! except escalation, which the orchestrator delivers on its own task.

use std::sync::Arc;

use sr_domain::{Message, OwnerId};
use sr_safety::CrisisSignal;

use super::CycleOutcome;

pub trait ConversationObserver: Send + Sync {
    /// The user message is stored and the backend is about to be called.
    fn on_cycle_start(&self, _owner: &OwnerId, _user_message: &Message) {}

    /// A crisis phrase matched the utterance.  Fires at most once per turn.
    fn on_escalation(&self, _owner: &OwnerId, _signal: &CrisisSignal) {}

    /// The cycle's terminal append happened (or was abandoned).  Always
    /// after any escalation for the same turn.
    fn on_cycle_end(&self, _owner: &OwnerId, _outcome: &CycleOutcome) {}

    /// A transcript feed delivered a changed, reconciled transcript.
    fn on_transcript(&self, _owner: &OwnerId, _messages: &[Message]) {}
}

/// Fan-out over registered observers.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn ConversationObserver>>,
}

impl ObserverSet {
    pub fn push(&mut self, observer: Arc<dyn ConversationObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn cycle_start(&self, owner: &OwnerId, user_message: &Message) {
        for o in &self.observers {
            o.on_cycle_start(owner, user_message);
        }
    }

    pub fn escalation(&self, owner: &OwnerId, signal: &CrisisSignal) {
        for o in &self.observers {
            o.on_escalation(owner, signal);
        }
    }

    pub fn cycle_end(&self, owner: &OwnerId, outcome: &CycleOutcome) {
        for o in &self.observers {
            o.on_cycle_end(owner, outcome);
        }
    }

    pub fn transcript(&self, owner: &OwnerId, messages: &[Message]) {
        for o in &self.observers {
            o.on_transcript(owner, messages);
        }
    }
}

/// Writes escalations and cycle ends to the log.  Registered by `serve`.
pub struct LoggingObserver;

impl ConversationObserver for LoggingObserver {
    fn on_escalation(&self, owner: &OwnerId, signal: &CrisisSignal) {
        tracing::warn!(
            owner = %owner,
            message_id = %signal.source_message_id,
            "crisis escalation raised"
        );
    }

    fn on_cycle_end(&self, owner: &OwnerId, outcome: &CycleOutcome) {
        tracing::info!(
            owner = %owner,
            resolution = outcome.resolution.label(),
            "cycle ended"
        );
    }
}
