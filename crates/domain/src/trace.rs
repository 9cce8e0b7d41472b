use serde::Serialize;

/// Structured trace events emitted across all serene crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    TranscriptAppend {
        owner: String,
        message_id: String,
        sender: String,
        seq: u64,
    },
    SnapshotReconciled {
        owner: String,
        delivered: usize,
        visible: usize,
        duplicates: usize,
    },
    SessionErased {
        owner: String,
        removed: usize,
    },
    CrisisDetected {
        owner: String,
        message_id: String,
        phrase_list_version: String,
        phrases: Vec<String>,
    },
    CycleStarted {
        owner: String,
        message_id: String,
        window_len: usize,
    },
    CompletionFailed {
        owner: String,
        attempt: u32,
        kind: String,
        message: String,
    },
    CycleResolved {
        owner: String,
        resolution: String,
        duration_ms: u64,
    },
    LateReplySuppressed {
        owner: String,
        message_id: String,
        reply_chars: usize,
    },
    LateReplyAppended {
        owner: String,
        message_id: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sr_event");
    }
}
