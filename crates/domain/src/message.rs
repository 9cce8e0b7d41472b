use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The user a session belongs to.  A session has no identity of its own:
/// it is the ordered set of messages sharing an owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for OwnerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

/// Logical creation time of a message.
///
/// A store may echo a local write before it has resolved the timestamp;
/// such messages are `Pending` and order after every resolved message.
/// Variant order matters: the derived `Ord` puts `Resolved` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Option<DateTime<Utc>>", into = "Option<DateTime<Utc>>")]
pub enum CreatedAt {
    Resolved(DateTime<Utc>),
    Pending,
}

impl CreatedAt {
    pub fn resolved(&self) -> Option<DateTime<Utc>> {
        match self {
            CreatedAt::Resolved(ts) => Some(*ts),
            CreatedAt::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CreatedAt::Pending)
    }
}

impl From<Option<DateTime<Utc>>> for CreatedAt {
    fn from(ts: Option<DateTime<Utc>>) -> Self {
        ts.map_or(CreatedAt::Pending, CreatedAt::Resolved)
    }
}

impl From<CreatedAt> for Option<DateTime<Utc>> {
    fn from(ts: CreatedAt) -> Self {
        ts.resolved()
    }
}

/// One immutable transcript entry, as assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub owner: OwnerId,
    pub sender: Sender,
    pub text: String,
    pub created_at: CreatedAt,
    /// Store insertion sequence, used to break `created_at` ties.
    pub seq: u64,
}

impl Message {
    /// Total order within a session: `(created_at, seq, id)`.
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then(self.seq.cmp(&other.seq))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub owner: OwnerId,
    pub sender: Sender,
    pub text: String,
}

impl NewMessage {
    pub fn user(owner: OwnerId, text: impl Into<String>) -> Self {
        Self { owner, sender: Sender::User, text: text.into() }
    }

    pub fn assistant(owner: OwnerId, text: impl Into<String>) -> Self {
        Self { owner, sender: Sender::Assistant, text: text.into() }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context window entries
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl From<Sender> for Role {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Role::User,
            Sender::Assistant => Role::Assistant,
        }
    }
}

/// A role-tagged entry sent to the completion backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub role: Role,
    pub content: String,
}

impl WindowEntry {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}
