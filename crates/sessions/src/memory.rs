//! Process-local transcript store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use sr_domain::error::StoreError;
use sr_domain::trace::TraceEvent;
use sr_domain::{CreatedAt, Message, NewMessage, OwnerId};

use crate::store::{ChangeNotifier, Subscription, TranscriptStore};

/// In-memory [`TranscriptStore`].
///
/// Cloning shares the same underlying logs.  Snapshots come back newest
/// first; readers order them with [`crate::reconcile`].
#[derive(Clone)]
pub struct MemoryTranscriptStore {
    sessions: Arc<RwLock<HashMap<OwnerId, Vec<Message>>>>,
    changes: ChangeNotifier,
    buffer: usize,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::with_buffer(32)
    }

    /// `buffer` bounds how many snapshots each subscription queues.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            changes: ChangeNotifier::default(),
            buffer,
        }
    }

    /// Number of owners with at least one message.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Default for MemoryTranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn append(&self, msg: NewMessage) -> Result<Message, StoreError> {
        let stored = {
            let mut sessions = self.sessions.write();
            let log = sessions.entry(msg.owner.clone()).or_default();
            let stored = next_message(log.last(), msg);
            log.push(stored.clone());
            stored
        };

        TraceEvent::TranscriptAppend {
            owner: stored.owner.to_string(),
            message_id: stored.id.clone(),
            sender: stored.sender.as_str().into(),
            seq: stored.seq,
        }
        .emit();

        self.changes.notify(&stored.owner);
        Ok(stored)
    }

    async fn snapshot(&self, owner: &OwnerId) -> Result<Vec<Message>, StoreError> {
        Ok(newest_first(&self.sessions, owner))
    }

    fn subscribe(&self, owner: &OwnerId) -> Subscription {
        let sessions = self.sessions.clone();
        Subscription::spawn(owner.clone(), self.changes.listen(), self.buffer, move |owner| {
            let messages = newest_first(&sessions, &owner);
            async move { Ok(messages) }
        })
    }

    async fn bulk_erase(&self, owner: &OwnerId) -> Result<usize, StoreError> {
        let removed = self
            .sessions
            .write()
            .remove(owner)
            .map(|log| log.len())
            .unwrap_or(0);

        TraceEvent::SessionErased {
            owner: owner.to_string(),
            removed,
        }
        .emit();

        self.changes.notify(owner);
        Ok(removed)
    }
}

fn newest_first(sessions: &RwLock<HashMap<OwnerId, Vec<Message>>>, owner: &OwnerId) -> Vec<Message> {
    sessions
        .read()
        .get(owner)
        .map(|log| log.iter().rev().cloned().collect())
        .unwrap_or_default()
}

/// Assign id, sequence and a timestamp that never runs behind the
/// owner's latest message.
pub(crate) fn next_message(last: Option<&Message>, msg: NewMessage) -> Message {
    let now = Utc::now();
    let created = match last.and_then(|m| m.created_at.resolved()) {
        Some(prev) if prev > now => prev,
        _ => now,
    };
    Message {
        id: uuid::Uuid::new_v4().to_string(),
        owner: msg.owner,
        sender: msg.sender,
        text: msg.text,
        created_at: CreatedAt::Resolved(created),
        seq: last.map_or(0, |m| m.seq + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use sr_domain::Sender;

    #[tokio::test]
    async fn append_assigns_monotonic_seq_and_time() {
        let store = MemoryTranscriptStore::new();
        let owner = OwnerId::new("u1");
        let a = store.append(NewMessage::user(owner.clone(), "one")).await.unwrap();
        let b = store.append(NewMessage::assistant(owner.clone(), "two")).await.unwrap();

        assert_eq!(a.seq, 0);
        assert_eq!(b.seq, 1);
        assert!(b.created_at >= a.created_at);
        assert_ne!(a.id, b.id);
        assert_eq!(b.sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn sessions_are_isolated_by_owner() {
        let store = MemoryTranscriptStore::new();
        store.append(NewMessage::user("u1".into(), "mine")).await.unwrap();
        store.append(NewMessage::user("u2".into(), "theirs")).await.unwrap();

        let snap = store.snapshot(&"u1".into()).await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].text, "mine");
        assert_eq!(store.session_count(), 2);
    }

    #[tokio::test]
    async fn subscription_delivers_initial_then_each_change() {
        let store = MemoryTranscriptStore::new();
        let owner = OwnerId::new("u1");
        store.append(NewMessage::user(owner.clone(), "before")).await.unwrap();

        let mut sub = store.subscribe(&owner);
        let first = sub.next().await.unwrap();
        assert_eq!(first.messages.len(), 1);

        store.append(NewMessage::assistant(owner.clone(), "after")).await.unwrap();
        let second = sub.next().await.unwrap();
        assert_eq!(second.messages.len(), 2);
    }

    #[tokio::test]
    async fn snapshots_need_reconciling() {
        let store = MemoryTranscriptStore::new();
        let owner = OwnerId::new("u1");
        for text in ["one", "two", "three"] {
            store.append(NewMessage::user(owner.clone(), text)).await.unwrap();
        }

        let raw = store.snapshot(&owner).await.unwrap();
        assert_eq!(raw[0].text, "three");

        let ordered = crate::reconcile(raw);
        let texts: Vec<_> = ordered.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);

        let mut sub = store.subscribe(&owner);
        let delivered = crate::reconcile(sub.next().await.unwrap().messages);
        assert_eq!(delivered, ordered);
    }

    #[tokio::test]
    async fn other_owners_do_not_wake_subscription() {
        let store = MemoryTranscriptStore::new();
        let owner = OwnerId::new("u1");
        let mut sub = store.subscribe(&owner);
        assert!(sub.next().await.unwrap().messages.is_empty());

        store.append(NewMessage::user("u2".into(), "elsewhere")).await.unwrap();
        store.append(NewMessage::user(owner.clone(), "here")).await.unwrap();

        let next = sub.next().await.unwrap();
        assert_eq!(next.messages.len(), 1);
        assert_eq!(next.messages[0].text, "here");
    }

    #[tokio::test]
    async fn bulk_erase_clears_and_notifies() {
        let store = MemoryTranscriptStore::new();
        let owner = OwnerId::new("u1");
        store.append(NewMessage::user(owner.clone(), "a")).await.unwrap();
        store.append(NewMessage::user(owner.clone(), "b")).await.unwrap();

        let mut sub = store.subscribe(&owner);
        assert_eq!(sub.next().await.unwrap().messages.len(), 2);

        assert_eq!(store.bulk_erase(&owner).await.unwrap(), 2);
        assert!(sub.next().await.unwrap().messages.is_empty());
        assert!(store.snapshot(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_ends_the_stream() {
        let store = MemoryTranscriptStore::new();
        let owner = OwnerId::new("u1");
        let mut sub = store.subscribe(&owner);
        assert!(sub.next().await.is_some());

        sub.unsubscribe();
        store.append(NewMessage::user(owner.clone(), "late")).await.unwrap();
        // The task exits on cancel; nothing else is queued.
        assert!(sub.next().await.is_none());
    }
}
