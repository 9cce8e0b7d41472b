//! Append-only JSONL transcripts.
//!
//! Each owner gets a `<owner>.jsonl` file under the transcripts directory.
//! Every message is appended as a single JSON line in the [`RawRecord`]
//! shape and normalized again on the way back in.
//!
//! Includes an in-memory write-through cache to avoid re-reading from disk
//! on every snapshot, and runs file I/O on the blocking pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use sr_domain::error::StoreError;
use sr_domain::trace::TraceEvent;
use sr_domain::{Message, NewMessage, OwnerId};

use crate::memory::next_message;
use crate::record::{normalize, RawRecord};
use crate::store::{ChangeNotifier, Subscription, TranscriptStore};

/// File-backed [`TranscriptStore`].
#[derive(Clone)]
pub struct JsonlTranscriptStore {
    inner: Arc<Inner>,
}

struct Inner {
    base_dir: PathBuf,
    cache: RwLock<HashMap<OwnerId, Vec<Message>>>,
    /// Serializes appends so sequence numbers stay unique per owner.
    append_lock: tokio::sync::Mutex<()>,
    changes: ChangeNotifier,
    buffer: usize,
}

impl JsonlTranscriptStore {
    /// Open (creating if needed) the transcript directory at
    /// `state_path/transcripts`.
    pub fn open(state_path: &Path, buffer: usize) -> Result<Self, StoreError> {
        let base_dir = state_path.join("transcripts");
        std::fs::create_dir_all(&base_dir)?;

        tracing::info!(path = %base_dir.display(), "jsonl transcript store opened");

        Ok(Self {
            inner: Arc::new(Inner {
                base_dir,
                cache: RwLock::new(HashMap::new()),
                append_lock: tokio::sync::Mutex::new(()),
                changes: ChangeNotifier::default(),
                buffer,
            }),
        })
    }

    /// Path of the transcript file for an owner.
    pub fn path_for(&self, owner: &OwnerId) -> PathBuf {
        self.inner.path_for(owner)
    }

    /// Drop the cached copy of a session (e.g. after the file was edited
    /// outside the store).
    pub fn invalidate_cache(&self, owner: &OwnerId) {
        self.inner.cache.write().remove(owner);
    }
}

impl Inner {
    fn path_for(&self, owner: &OwnerId) -> PathBuf {
        self.base_dir.join(format!("{}.jsonl", file_stem(owner)))
    }

    /// Return cached messages if available, otherwise load from disk on a
    /// blocking thread and populate the cache.
    ///
    /// Cold loads take `append_lock` so a read that started before an
    /// append or erase can never replace the newer cache entry.
    async fn load(&self, owner: &OwnerId) -> Result<Vec<Message>, StoreError> {
        if let Some(messages) = self.cached(owner) {
            return Ok(messages);
        }
        let _guard = self.append_lock.lock().await;
        self.load_locked(owner).await
    }

    /// Same as [`Inner::load`]; the caller must hold `append_lock`.
    async fn load_locked(&self, owner: &OwnerId) -> Result<Vec<Message>, StoreError> {
        if let Some(messages) = self.cached(owner) {
            return Ok(messages);
        }

        let path = self.path_for(owner);
        let messages = tokio::task::spawn_blocking(move || read_jsonl_file(&path))
            .await
            .map_err(|e| StoreError::Unavailable(format!("spawn_blocking join: {e}")))??;

        self.cache.write().insert(owner.clone(), messages.clone());
        Ok(messages)
    }

    fn cached(&self, owner: &OwnerId) -> Option<Vec<Message>> {
        self.cache.read().get(owner).cloned()
    }
}

#[async_trait::async_trait]
impl TranscriptStore for JsonlTranscriptStore {
    async fn append(&self, msg: NewMessage) -> Result<Message, StoreError> {
        let inner = &self.inner;
        let _guard = inner.append_lock.lock().await;

        let existing = inner.load_locked(&msg.owner).await?;
        let stored = next_message(existing.last(), msg);

        let line = serialize_line(&stored)?;
        let path = inner.path_for(&stored.owner);

        // Write to disk first; only update the cache if I/O succeeds.
        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            file.write_all(line.as_bytes())?;
            Ok::<(), std::io::Error>(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking join: {e}")))??;

        inner
            .cache
            .write()
            .entry(stored.owner.clone())
            .or_default()
            .push(stored.clone());

        TraceEvent::TranscriptAppend {
            owner: stored.owner.to_string(),
            message_id: stored.id.clone(),
            sender: stored.sender.as_str().into(),
            seq: stored.seq,
        }
        .emit();

        inner.changes.notify(&stored.owner);
        Ok(stored)
    }

    async fn snapshot(&self, owner: &OwnerId) -> Result<Vec<Message>, StoreError> {
        self.inner.load(owner).await
    }

    fn subscribe(&self, owner: &OwnerId) -> Subscription {
        let inner = self.inner.clone();
        Subscription::spawn(
            owner.clone(),
            inner.changes.listen(),
            inner.buffer,
            move |owner| {
                let inner = inner.clone();
                async move { inner.load(&owner).await }
            },
        )
    }

    async fn bulk_erase(&self, owner: &OwnerId) -> Result<usize, StoreError> {
        let inner = &self.inner;
        let _guard = inner.append_lock.lock().await;

        let removed = inner.load_locked(owner).await?.len();
        let path = inner.path_for(owner);
        tokio::task::spawn_blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking join: {e}")))??;

        inner.cache.write().remove(owner);

        TraceEvent::SessionErased {
            owner: owner.to_string(),
            removed,
        }
        .emit();

        inner.changes.notify(owner);
        Ok(removed)
    }
}

// ── Private helpers ───────────────────────────────────────────────

/// Filename-safe, collision-free encoding of an owner id: ASCII
/// alphanumerics and `-` pass through, every other byte becomes `_xx`.
fn file_stem(owner: &OwnerId) -> String {
    let mut out = String::with_capacity(owner.as_str().len());
    for b in owner.as_str().bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{b:02x}"));
        }
    }
    out
}

fn serialize_line(msg: &Message) -> Result<String, StoreError> {
    let mut json = serde_json::to_string(&RawRecord::from(msg))
        .map_err(|e| StoreError::Unavailable(format!("serializing transcript line: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Read and normalize a JSONL transcript file, skipping lines that do not
/// parse or do not fit the message schema.
fn read_jsonl_file(path: &Path) -> Result<Vec<Message>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path)?;
    let mut messages = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = match serde_json::from_str::<RawRecord>(line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %path.display(), line = idx + 1, error = %e, "skipping unparsable transcript line");
                continue;
            }
        };
        match normalize(record, idx as u64) {
            Ok(msg) => messages.push(msg),
            Err(e) => {
                tracing::warn!(path = %path.display(), line = idx + 1, error = %e, "skipping malformed transcript record");
            }
        }
    }
    Ok(messages)
}
