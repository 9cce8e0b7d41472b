//! Strict schema boundary between raw store records and [`Message`].
//!
//! Stores hand back loosely-shaped documents (camelCase keys, optional
//! fields, legacy `"ai"` senders, RFC 3339 strings or epoch millis).  Every
//! record passes through [`normalize`] before the orchestrator sees it;
//! anything that does not fit is rejected with a [`RecordError`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use sr_domain::error::RecordError;
use sr_domain::{CreatedAt, Message, OwnerId, Sender};

/// A transcript record as it sits in the backing store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "owner")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl From<&Message> for RawRecord {
    fn from(msg: &Message) -> Self {
        Self {
            id: Some(msg.id.clone()),
            user_id: Some(msg.owner.to_string()),
            sender: Some(msg.sender.as_str().to_owned()),
            text: Some(msg.text.clone()),
            timestamp: msg
                .created_at
                .resolved()
                .map(|ts| Value::String(ts.to_rfc3339())),
            seq: Some(msg.seq),
        }
    }
}

/// Convert a raw record into a [`Message`].
///
/// `fallback_seq` is used for records written without a sequence number
/// (the record's position in its log); records without an id get one
/// derived from it.
pub fn normalize(raw: RawRecord, fallback_seq: u64) -> Result<Message, RecordError> {
    let owner = raw
        .user_id
        .filter(|o| !o.trim().is_empty())
        .ok_or(RecordError::MissingField("userId"))?;

    let sender = match raw.sender.as_deref() {
        None => return Err(RecordError::MissingField("sender")),
        Some(s) => parse_sender(s)?,
    };

    let text = raw.text.ok_or(RecordError::MissingField("text"))?;
    if text.trim().is_empty() {
        return Err(RecordError::BlankText);
    }

    let created_at = parse_timestamp(raw.timestamp)?;
    let seq = raw.seq.unwrap_or(fallback_seq);
    let id = raw.id.unwrap_or_else(|| format!("seq-{seq}"));

    Ok(Message {
        id,
        owner: OwnerId::new(owner),
        sender,
        text,
        created_at,
        seq,
    })
}

fn parse_sender(raw: &str) -> Result<Sender, RecordError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "user" => Ok(Sender::User),
        // Early transcripts tagged replies as "ai".
        "assistant" | "ai" => Ok(Sender::Assistant),
        _ => Err(RecordError::UnknownSender(raw.to_owned())),
    }
}

fn parse_timestamp(raw: Option<Value>) -> Result<CreatedAt, RecordError> {
    match raw {
        None | Some(Value::Null) => Ok(CreatedAt::Pending),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|ts| CreatedAt::Resolved(ts.with_timezone(&Utc)))
            .map_err(|_| RecordError::BadTimestamp(s)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(CreatedAt::Resolved)
            .ok_or_else(|| RecordError::BadTimestamp(n.to_string())),
        Some(other) => Err(RecordError::BadTimestamp(other.to_string())),
    }
}
