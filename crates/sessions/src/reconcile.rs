//! Turning unordered, possibly redelivered snapshots into one stable
//! visible order.
//!
//! Every delivery is re-sorted from scratch and replaces the previous
//! sequence wholesale.  Arrival order is never trusted: an echo of our own
//! append can land after a reply that was written later.

use std::collections::HashSet;

use sr_domain::trace::TraceEvent;
use sr_domain::{Message, OwnerId};

use crate::store::TranscriptSnapshot;

/// Sort by `(created_at, seq, id)` and drop repeated ids.
///
/// When the same id shows up both pending and resolved, the resolved copy
/// sorts first and is the one kept.
pub fn reconcile(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(Message::cmp_order);
    let mut seen = HashSet::with_capacity(messages.len());
    messages.retain(|m| seen.insert(m.id.clone()));
    messages
}

/// The last reconciled transcript for one owner.
#[derive(Debug, Clone)]
pub struct TranscriptView {
    owner: OwnerId,
    messages: Vec<Message>,
}

impl TranscriptView {
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            messages: Vec::new(),
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Replace the visible sequence with the reconciled snapshot.
    /// Returns `true` when the visible transcript changed.
    ///
    /// Snapshots for a different owner are ignored.
    pub fn apply(&mut self, snapshot: TranscriptSnapshot) -> bool {
        if snapshot.owner != self.owner {
            tracing::warn!(
                expected = %self.owner,
                got = %snapshot.owner,
                "ignoring snapshot for another owner"
            );
            return false;
        }

        let delivered = snapshot.messages.len();
        let next = reconcile(snapshot.messages);

        TraceEvent::SnapshotReconciled {
            owner: self.owner.to_string(),
            delivered,
            visible: next.len(),
            duplicates: delivered - next.len(),
        }
        .emit();

        if next == self.messages {
            return false;
        }
        self.messages = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use sr_domain::{CreatedAt, Sender};

    fn msg(id: &str, secs: i64, seq: u64) -> Message {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Message {
            id: id.into(),
            owner: OwnerId::new("u1"),
            sender: Sender::User,
            text: id.into(),
            created_at: CreatedAt::Resolved(base + Duration::seconds(secs)),
            seq,
        }
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn sorts_regardless_of_delivery_order() {
        let delivered = vec![msg("c", 3, 2), msg("a", 1, 0), msg("b", 2, 1)];
        assert_eq!(ids(&reconcile(delivered)), ["a", "b", "c"]);
    }

    #[test]
    fn every_permutation_yields_the_same_order() {
        let base = [msg("a", 1, 0), msg("b", 2, 1), msg("c", 3, 2), msg("d", 4, 3)];
        let perms: [[usize; 4]; 6] = [
            [0, 1, 2, 3],
            [3, 2, 1, 0],
            [1, 3, 0, 2],
            [2, 0, 3, 1],
            [3, 0, 2, 1],
            [1, 2, 3, 0],
        ];
        for perm in perms {
            let delivered: Vec<Message> = perm.iter().map(|&i| base[i].clone()).collect();
            assert_eq!(ids(&reconcile(delivered)), ["a", "b", "c", "d"]);
        }
    }

    #[test]
    fn redelivered_records_collapse() {
        let delivered = vec![msg("b", 2, 1), msg("a", 1, 0), msg("b", 2, 1), msg("a", 1, 0)];
        assert_eq!(ids(&reconcile(delivered)), ["a", "b"]);
    }

    #[test]
    fn pending_echo_sorts_last_and_resolved_copy_wins() {
        let mut pending = msg("b", 0, 1);
        pending.created_at = CreatedAt::Pending;
        let delivered = vec![pending.clone(), msg("a", 1, 0)];
        assert_eq!(ids(&reconcile(delivered)), ["a", "b"]);

        let resolved = msg("b", 2, 1);
        let out = reconcile(vec![pending, msg("a", 1, 0), resolved.clone()]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], resolved);
    }

    #[test]
    fn view_replaces_wholesale_and_reports_changes() {
        let owner = OwnerId::new("u1");
        let mut view = TranscriptView::new(owner.clone());

        let changed = view.apply(TranscriptSnapshot {
            owner: owner.clone(),
            messages: vec![msg("b", 2, 1), msg("a", 1, 0)],
        });
        assert!(changed);
        assert_eq!(ids(view.messages()), ["a", "b"]);

        // Same set, different order: nothing visible changes.
        let changed = view.apply(TranscriptSnapshot {
            owner: owner.clone(),
            messages: vec![msg("a", 1, 0), msg("b", 2, 1)],
        });
        assert!(!changed);

        // Erase: an empty snapshot empties the view.
        assert!(view.apply(TranscriptSnapshot { owner, messages: Vec::new() }));
        assert!(view.messages().is_empty());
    }

    #[test]
    fn view_ignores_foreign_owner() {
        let mut view = TranscriptView::new(OwnerId::new("u1"));
        let changed = view.apply(TranscriptSnapshot {
            owner: OwnerId::new("u2"),
            messages: vec![msg("a", 1, 0)],
        });
        assert!(!changed);
        assert!(view.messages().is_empty());
    }
}
