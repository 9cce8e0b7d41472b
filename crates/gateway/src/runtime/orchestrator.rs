//! The per-session cycle state machine.
//!
//! `Idle -> Submitting -> AwaitingCompletion -> {Resolved, FallbackResolved} -> Idle`
//!
//! A cycle always ends in exactly one terminal append: the backend reply or
//! the fallback message.  Backend attempts run on their own tasks and are
//! never cancelled, so a reply can still arrive after the cycle fell back;
//! the late-reply policy decides what happens to it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use sr_contextpack::ContextWindowBuilder;
use sr_domain::config::{Config, LateReplyPolicy};
use sr_domain::error::{CompletionError, StoreError};
use sr_domain::trace::TraceEvent;
use sr_domain::{Message, NewMessage, OwnerId};
use sr_providers::{CompletionBackend, CompletionRequest};
use sr_safety::{CrisisDetector, CrisisSignal};
use sr_sessions::{reconcile, TranscriptStore};

use super::feed::TranscriptFeed;
use super::observer::{ConversationObserver, ObserverSet};
use super::session_lock::{CycleGuard, SessionLockMap};
use super::{CycleOutcome, CycleState, EraseError, Resolution, SubmitError, FALLBACK_MESSAGE};

type AttemptResult = (u32, Result<String, CompletionError>);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-cycle knobs, resolved once from config.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Deadline for each backend attempt.
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Extra attempts after a retryable failure.
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub late_reply: LateReplyPolicy,
    /// Extra attempts for the terminal append when the store fails.
    pub terminal_append_retries: u32,
    /// Snapshot buffer for transcript feeds.
    pub feed_buffer: usize,
}

impl CycleSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            timeout: Duration::from_millis(cfg.llm.timeout_ms),
            max_tokens: cfg.llm.max_tokens,
            temperature: cfg.llm.temperature,
            max_retries: cfg.llm.max_retries,
            retry_backoff: Duration::from_millis(cfg.llm.retry_backoff_ms),
            late_reply: cfg.llm.late_reply,
            terminal_append_retries: cfg.sessions.terminal_append_retries,
            feed_buffer: cfg.sessions.subscription_buffer,
        }
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cycle handle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Returned by a successful submit.  The user message is already stored.
pub struct CycleHandle {
    user_message: Message,
    rx: oneshot::Receiver<CycleOutcome>,
}

impl CycleHandle {
    pub fn user_message(&self) -> &Message {
        &self.user_message
    }

    /// Wait for the cycle to end.  `None` only if the cycle task died.
    pub async fn outcome(self) -> Option<CycleOutcome> {
        self.rx.await.ok()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cheap to clone; clones share locks, store and backend.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn TranscriptStore>,
    backend: Arc<dyn CompletionBackend>,
    detector: Arc<CrisisDetector>,
    window: Arc<ContextWindowBuilder>,
    locks: Arc<SessionLockMap>,
    observers: ObserverSet,
    settings: Arc<CycleSettings>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        backend: Arc<dyn CompletionBackend>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            store,
            backend,
            detector: Arc::new(CrisisDetector::default()),
            window: Arc::new(ContextWindowBuilder::default()),
            locks: Arc::new(SessionLockMap::new()),
            observers: ObserverSet::default(),
            settings: Arc::new(settings),
        }
    }

    pub fn with_detector(mut self, detector: CrisisDetector) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn with_window_builder(mut self, builder: ContextWindowBuilder) -> Self {
        self.window = Arc::new(builder);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ConversationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn store(&self) -> &Arc<dyn TranscriptStore> {
        &self.store
    }

    pub fn detector(&self) -> &CrisisDetector {
        &self.detector
    }

    pub fn locks(&self) -> &SessionLockMap {
        &self.locks
    }

    pub fn state(&self, owner: &OwnerId) -> CycleState {
        self.locks.state(owner)
    }

    /// Current reconciled transcript.
    pub async fn transcript(&self, owner: &OwnerId) -> Result<Vec<Message>, StoreError> {
        Ok(reconcile(self.store.snapshot(owner).await?))
    }

    /// Live reconciled transcript for an owner.  Observers get
    /// `on_transcript` for every visible change.
    pub fn feed(&self, owner: &OwnerId) -> TranscriptFeed {
        TranscriptFeed::spawn(
            self.store.as_ref(),
            owner.clone(),
            self.observers.clone(),
        )
    }

    /// Data reset: remove every message for an owner.
    ///
    /// Holds the session's cycle lock for the duration, so it is refused
    /// while a cycle is in flight and no submit can start mid-erase.
    pub async fn erase(&self, owner: &OwnerId) -> Result<usize, EraseError> {
        let _guard = self
            .locks
            .try_acquire(owner)
            .map_err(|_| EraseError::SessionBusy)?;

        self.store.bulk_erase(owner).await.map_err(|e| {
            tracing::warn!(owner = %owner, error = %e, "transcript erase failed");
            EraseError::StoreUnavailable(e.to_string())
        })
    }

    // ── Submit ────────────────────────────────────────────────────

    /// Store `text` as a user message and start a cycle.
    ///
    /// Returns once the user message is stored.  Fails without touching the
    /// transcript when the text is blank, the session already has a cycle
    /// in flight, or the store rejects the append.
    pub async fn submit(&self, owner: &OwnerId, text: &str) -> Result<CycleHandle, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        let guard = self
            .locks
            .try_acquire(owner)
            .map_err(|_| SubmitError::SessionBusy)?;

        // The guard returns the owner to Idle if this fails.
        let user_message = self
            .store
            .append(NewMessage::user(owner.clone(), text))
            .await
            .map_err(|e| {
                tracing::warn!(owner = %owner, error = %e, "user message append failed");
                SubmitError::StoreUnavailable(e.to_string())
            })?;

        guard.set(CycleState::AwaitingCompletion);
        self.observers.cycle_start(owner, &user_message);

        let crisis = self.detector.signal(&user_message.id, &user_message.text);
        let escalation = crisis.matched.then(|| self.escalate(owner, &user_message, &crisis));

        let (tx, rx) = oneshot::channel();
        let this = self.clone();
        let stored = user_message.clone();
        tokio::spawn(async move {
            let outcome = this.run_cycle(guard, stored, crisis, escalation).await;
            // Nobody waiting is fine.
            let _ = tx.send(outcome);
        });

        Ok(CycleHandle { user_message, rx })
    }

    /// Raise the escalation on its own task so it never waits on, or
    /// holds up, the reply path.
    fn escalate(&self, owner: &OwnerId, user_message: &Message, signal: &CrisisSignal) -> JoinHandle<()> {
        let list = self.detector.phrase_list();
        TraceEvent::CrisisDetected {
            owner: owner.to_string(),
            message_id: user_message.id.clone(),
            phrase_list_version: list.version().to_owned(),
            phrases: self
                .detector
                .matched_phrases(&user_message.text)
                .into_iter()
                .map(String::from)
                .collect(),
        }
        .emit();

        let observers = self.observers.clone();
        let owner = owner.clone();
        let signal = signal.clone();
        tokio::spawn(async move {
            observers.escalation(&owner, &signal);
        })
    }

    // ── Cycle ─────────────────────────────────────────────────────

    async fn run_cycle(
        &self,
        guard: CycleGuard,
        user_message: Message,
        crisis: CrisisSignal,
        escalation: Option<JoinHandle<()>>,
    ) -> CycleOutcome {
        let started = Instant::now();
        let owner = user_message.owner.clone();

        let request = Arc::new(self.build_request(&user_message).await);
        let (tx, mut rx) = mpsc::unbounded_channel::<AttemptResult>();
        let result = self.complete_with_retries(&owner, &request, &tx, &mut rx).await;
        drop(tx);

        let (text, resolution) = match result {
            Ok(reply) => (reply, Resolution::Resolved),
            Err(e) => (
                FALLBACK_MESSAGE.to_owned(),
                Resolution::FallbackResolved {
                    kind: e.kind().to_owned(),
                },
            ),
        };

        let (reply, resolution) = match self.append_terminal(&owner, text).await {
            Some(stored) => (Some(stored), resolution),
            None => (None, Resolution::Abandoned),
        };

        if matches!(resolution, Resolution::FallbackResolved { .. }) {
            self.spawn_late_reply_drain(owner.clone(), user_message.id.clone(), rx);
        }

        // Release the session before anyone learns the cycle ended.
        drop(guard);

        if let Some(handle) = escalation {
            if let Err(e) = handle.await {
                tracing::warn!(owner = %owner, error = %e, "escalation delivery task failed");
            }
        }

        let outcome = CycleOutcome {
            user_message,
            reply,
            resolution,
            crisis,
        };
        self.observers.cycle_end(&owner, &outcome);

        TraceEvent::CycleResolved {
            owner: owner.to_string(),
            resolution: outcome.resolution.label().into(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        outcome
    }

    /// Window from the current transcript, falling back to the utterance
    /// alone when the snapshot cannot be read.
    async fn build_request(&self, user_message: &Message) -> CompletionRequest {
        let owner = &user_message.owner;
        let prior = match self.store.snapshot(owner).await {
            Ok(messages) => {
                let mut visible = reconcile(messages);
                visible.retain(|m| m.id != user_message.id);
                visible
            }
            Err(e) => {
                tracing::warn!(
                    owner = %owner,
                    error = %e,
                    "snapshot read failed; building window from the utterance alone"
                );
                Vec::new()
            }
        };

        let (window, report) = self.window.build(&prior, &user_message.text);
        TraceEvent::CycleStarted {
            owner: owner.to_string(),
            message_id: user_message.id.clone(),
            window_len: window.len(),
        }
        .emit();
        tracing::debug!(owner = %owner, dropped = report.dropped, "window ready");

        let s = &self.settings;
        CompletionRequest::from_window(window, s.max_tokens, s.temperature, s.timeout)
    }

    /// Run attempts until one succeeds, a failure is not retryable, or the
    /// retry budget is spent.  A success from an earlier, timed-out
    /// attempt that lands while a later one is pending is accepted.
    async fn complete_with_retries(
        &self,
        owner: &OwnerId,
        request: &Arc<CompletionRequest>,
        tx: &mpsc::UnboundedSender<AttemptResult>,
        rx: &mut mpsc::UnboundedReceiver<AttemptResult>,
    ) -> Result<String, CompletionError> {
        let s = &self.settings;
        let mut attempt: u32 = 1;
        loop {
            self.spawn_attempt(attempt, request.clone(), tx.clone());
            let deadline = Instant::now() + s.timeout;

            let result = loop {
                match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(Some((_, Ok(reply)))) => break Ok(reply),
                    Ok(Some((n, Err(e)))) if n == attempt => break Err(e),
                    Ok(Some((n, Err(e)))) => {
                        tracing::debug!(owner = %owner, attempt = n, error = %e, "stale attempt failed");
                    }
                    Ok(None) => {
                        break Err(CompletionError::Unavailable("attempt channel closed".into()))
                    }
                    Err(_) => {
                        break Err(CompletionError::Timeout(format!(
                            "no reply within {}ms",
                            s.timeout.as_millis()
                        )))
                    }
                }
            };

            let err = match result {
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };

            TraceEvent::CompletionFailed {
                owner: owner.to_string(),
                attempt,
                kind: err.kind().into(),
                message: err.to_string(),
            }
            .emit();

            if !err.is_retryable() || attempt > s.max_retries {
                return Err(err);
            }
            tracing::info!(owner = %owner, attempt, kind = err.kind(), "retrying completion");
            tokio::time::sleep(s.retry_backoff).await;
            attempt += 1;
        }
    }

    fn spawn_attempt(&self, attempt: u32, request: Arc<CompletionRequest>, tx: mpsc::UnboundedSender<AttemptResult>) {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            let result = backend.complete(&request).await;
            // The cycle may have moved on; a closed channel is expected.
            let _ = tx.send((attempt, result));
        });
    }

    /// Append the reply or fallback, retrying on store failure.
    async fn append_terminal(&self, owner: &OwnerId, text: String) -> Option<Message> {
        let attempts = self.settings.terminal_append_retries + 1;
        for n in 1..=attempts {
            match self
                .store
                .append(NewMessage::assistant(owner.clone(), text.clone()))
                .await
            {
                Ok(stored) => return Some(stored),
                Err(e) => {
                    tracing::warn!(owner = %owner, attempt = n, error = %e, "terminal append failed");
                    if n < attempts {
                        tokio::time::sleep(self.settings.retry_backoff).await;
                    }
                }
            }
        }
        tracing::error!(owner = %owner, "cycle abandoned: no terminal message could be stored");
        None
    }

    /// After a fallback, watch the still-running attempts for a success
    /// and apply the late-reply policy to the first one.
    fn spawn_late_reply_drain(
        &self,
        owner: OwnerId,
        message_id: String,
        mut rx: mpsc::UnboundedReceiver<AttemptResult>,
    ) {
        let store = self.store.clone();
        let policy = self.settings.late_reply;
        tokio::spawn(async move {
            // Ends once every attempt task has reported.
            while let Some((attempt, result)) = rx.recv().await {
                let Ok(reply) = result else { continue };
                match policy {
                    LateReplyPolicy::Suppress => {
                        TraceEvent::LateReplySuppressed {
                            owner: owner.to_string(),
                            message_id: message_id.clone(),
                            reply_chars: reply.chars().count(),
                        }
                        .emit();
                        tracing::info!(owner = %owner, attempt, "late reply suppressed");
                    }
                    LateReplyPolicy::Append => {
                        match store.append(NewMessage::assistant(owner.clone(), reply)).await {
                            Ok(_) => TraceEvent::LateReplyAppended {
                                owner: owner.to_string(),
                                message_id: message_id.clone(),
                            }
                            .emit(),
                            Err(e) => {
                                tracing::warn!(owner = %owner, error = %e, "late reply append failed")
                            }
                        }
                    }
                }
                break;
            }
        });
    }
}
