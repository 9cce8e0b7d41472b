//! Shared fixtures for gateway integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use sr_domain::error::{CompletionError, StoreError};
use sr_domain::{Message, NewMessage, OwnerId};
use sr_gateway::runtime::{ConversationObserver, CycleOutcome, CycleSettings, Orchestrator};
use sr_providers::{CompletionBackend, CompletionRequest};
use sr_safety::CrisisSignal;
use sr_sessions::{MemoryTranscriptStore, Subscription, TranscriptStore};

// ── Scripted backend ─────────────────────────────────────────────────

/// One scripted backend reply: wait `delay`, then return `result`.
#[derive(Clone)]
pub struct Step {
    pub delay: Duration,
    pub result: Result<String, CompletionError>,
}

pub fn reply(text: &str) -> Step {
    Step { delay: Duration::ZERO, result: Ok(text.into()) }
}

pub fn slow_reply(text: &str, delay: Duration) -> Step {
    Step { delay, result: Ok(text.into()) }
}

pub fn fail(err: CompletionError) -> Step {
    Step { delay: Duration::ZERO, result: Err(err) }
}

/// Plays back steps in order; once exhausted, replies "ok".
#[derive(Default)]
pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().push(req.clone());
        let step = self.steps.lock().pop_front().unwrap_or_else(|| reply("ok"));
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
    }

    fn backend_id(&self) -> &str {
        "scripted"
    }
}

// ── Flaky store ──────────────────────────────────────────────────────

/// Memory store with switchable failures.
pub struct FlakyStore {
    inner: MemoryTranscriptStore,
    appends_left: AtomicUsize,
    fail_next: AtomicUsize,
    fail_snapshots: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryTranscriptStore::new(),
            appends_left: AtomicUsize::new(usize::MAX),
            fail_next: AtomicUsize::new(0),
            fail_snapshots: AtomicBool::new(false),
        })
    }

    /// Let `n` more appends succeed, then fail every one after.
    pub fn fail_appends_after(&self, n: usize) {
        self.appends_left.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` appends, then succeed again.
    pub fn fail_next_appends(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn heal_appends(&self) {
        self.appends_left.store(usize::MAX, Ordering::SeqCst);
    }

    pub fn fail_snapshots(&self, on: bool) {
        self.fail_snapshots.store(on, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl TranscriptStore for FlakyStore {
    async fn append(&self, msg: NewMessage) -> Result<Message, StoreError> {
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected append failure".into()));
        }
        let allowed = self
            .appends_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if !allowed {
            return Err(StoreError::Unavailable("injected append failure".into()));
        }
        self.inner.append(msg).await
    }

    async fn snapshot(&self, owner: &OwnerId) -> Result<Vec<Message>, StoreError> {
        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected snapshot failure".into()));
        }
        self.inner.snapshot(owner).await
    }

    fn subscribe(&self, owner: &OwnerId) -> Subscription {
        self.inner.subscribe(owner)
    }

    async fn bulk_erase(&self, owner: &OwnerId) -> Result<usize, StoreError> {
        self.inner.bulk_erase(owner).await
    }
}

// ── Recording observer ───────────────────────────────────────────────

/// Records callback names in arrival order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == name).count()
    }
}

impl ConversationObserver for RecordingObserver {
    fn on_cycle_start(&self, _owner: &OwnerId, _user_message: &Message) {
        self.events.lock().push("start".into());
    }

    fn on_escalation(&self, _owner: &OwnerId, _signal: &CrisisSignal) {
        self.events.lock().push("escalation".into());
    }

    fn on_cycle_end(&self, _owner: &OwnerId, _outcome: &CycleOutcome) {
        self.events.lock().push("end".into());
    }
}

// ── Builders ─────────────────────────────────────────────────────────

/// Short deadlines, no retries, no backoff.
pub fn quick_settings() -> CycleSettings {
    CycleSettings {
        timeout: Duration::from_secs(20),
        max_retries: 0,
        retry_backoff: Duration::ZERO,
        terminal_append_retries: 0,
        ..CycleSettings::default()
    }
}

pub fn orchestrator(
    store: Arc<dyn TranscriptStore>,
    backend: Arc<ScriptedBackend>,
    settings: CycleSettings,
) -> Orchestrator {
    Orchestrator::new(store, backend, settings)
}

pub fn owner(name: &str) -> OwnerId {
    OwnerId::new(name)
}
