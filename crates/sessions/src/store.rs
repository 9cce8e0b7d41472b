//! Transcript store contract and live subscriptions.
//!
//! A store is an append-only, per-owner log.  Reads come back as full
//! snapshots in no particular order; a subscription re-delivers the whole
//! snapshot after every mutation for its owner, possibly more than once.
//! Ordering is the reader's job (see [`crate::reconcile`]).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use sr_domain::error::StoreError;
use sr_domain::{Message, NewMessage, OwnerId};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The full, store-reported message set for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSnapshot {
    pub owner: OwnerId,
    /// Unordered; may contain redelivered records.
    pub messages: Vec<Message>,
}

#[async_trait::async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Store a message, assigning its id, sequence number and timestamp.
    async fn append(&self, msg: NewMessage) -> Result<Message, StoreError>;

    /// Current message set for an owner.
    async fn snapshot(&self, owner: &OwnerId) -> Result<Vec<Message>, StoreError>;

    /// Live feed of snapshots for an owner.  Yields the current snapshot
    /// first, then one per mutation.  Call again to restart.
    fn subscribe(&self, owner: &OwnerId) -> Subscription;

    /// Remove every message for an owner.  Returns how many were removed.
    async fn bulk_erase(&self, owner: &OwnerId) -> Result<usize, StoreError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Change notification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Broadcasts "owner X changed" to every live subscription of a store.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<OwnerId>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn notify(&self, owner: &OwnerId) {
        // No receivers just means nobody is subscribed.
        let _ = self.tx.send(owner.clone());
    }

    pub fn listen(&self) -> broadcast::Receiver<OwnerId> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Subscription
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A cancellable stream of [`TranscriptSnapshot`]s backed by a task and
/// a bounded channel.  Dropping it unsubscribes.
pub struct Subscription {
    owner: OwnerId,
    rx: mpsc::Receiver<TranscriptSnapshot>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Spawn the feed task.  `fetch` reads the current snapshot; it runs
    /// once up front and again each time `changes` names `owner`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(
        owner: OwnerId,
        mut changes: broadcast::Receiver<OwnerId>,
        buffer: usize,
        fetch: F,
    ) -> Self
    where
        F: Fn(OwnerId) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<Message>, StoreError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task_owner = owner.clone();

        tokio::spawn(async move {
            let mut pending = true;
            loop {
                if pending {
                    match fetch(task_owner.clone()).await {
                        Ok(messages) => {
                            let snapshot = TranscriptSnapshot {
                                owner: task_owner.clone(),
                                messages,
                            };
                            tokio::select! {
                                biased;
                                _ = token.cancelled() => break,
                                sent = tx.send(snapshot) => {
                                    if sent.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            // The next change retries the read.
                            tracing::warn!(
                                owner = %task_owner,
                                error = %e,
                                "subscription snapshot read failed"
                            );
                        }
                    }
                }

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    change = changes.recv() => {
                        pending = match change {
                            Ok(changed) => changed == task_owner,
                            // Missed notifications: assume ours was among them.
                            Err(broadcast::error::RecvError::Lagged(_)) => true,
                            Err(broadcast::error::RecvError::Closed) => break,
                        };
                    }
                }
            }
            tracing::debug!(owner = %task_owner, "subscription closed");
        });

        Self { owner, rx, cancel }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Wait for the next snapshot.  `None` once unsubscribed or the store
    /// went away.
    pub async fn next_snapshot(&mut self) -> Option<TranscriptSnapshot> {
        self.rx.recv().await
    }

    /// Stop the feed task.  Snapshots already buffered can still be read.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }
}

impl futures_core::Stream for Subscription {
    type Item = TranscriptSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
