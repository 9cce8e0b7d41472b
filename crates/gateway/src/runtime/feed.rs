//! Live reconciled transcript for one owner.
//!
//! Wraps a store subscription in a task that reconciles every delivery and
//! publishes the visible sequence through a `watch` channel, so readers
//! only ever see whole, ordered transcripts.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use sr_domain::{Message, OwnerId};
use sr_sessions::{TranscriptStore, TranscriptView};

use super::observer::ObserverSet;

pub struct TranscriptFeed {
    owner: OwnerId,
    rx: watch::Receiver<Vec<Message>>,
    cancel: CancellationToken,
}

impl TranscriptFeed {
    /// Subscribe to `owner` and start reconciling.  Must be called from
    /// within a tokio runtime.
    pub fn spawn(store: &dyn TranscriptStore, owner: OwnerId, observers: ObserverSet) -> Self {
        let mut subscription = store.subscribe(&owner);
        let (tx, rx) = watch::channel(Vec::new());
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task_owner = owner.clone();

        tokio::spawn(async move {
            let mut view = TranscriptView::new(task_owner.clone());
            loop {
                let snapshot = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    next = subscription.next_snapshot() => match next {
                        Some(s) => s,
                        None => break,
                    },
                };
                if view.apply(snapshot) {
                    observers.transcript(&task_owner, view.messages());
                    tx.send_replace(view.messages().to_vec());
                }
            }
            subscription.unsubscribe();
            tracing::debug!(owner = %task_owner, "transcript feed closed");
        });

        Self { owner, rx, cancel }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// The last reconciled transcript (empty until the first delivery).
    pub fn current(&self) -> Vec<Message> {
        self.rx.borrow().clone()
    }

    /// Wait for the next visible change and return it.  `None` once the
    /// feed has stopped.
    pub async fn changed(&mut self) -> Option<Vec<Message>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the transcript satisfies `pred`, returning it.
    pub async fn wait_for<F>(&mut self, mut pred: F) -> Option<Vec<Message>>
    where
        F: FnMut(&[Message]) -> bool,
    {
        let guard = self.rx.wait_for(|msgs| pred(msgs)).await.ok()?;
        Some(guard.clone())
    }

    /// Stop the feed task.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TranscriptFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
