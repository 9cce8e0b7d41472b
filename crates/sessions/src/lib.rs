//! Transcript storage for serene.
//!
//! An append-only, per-owner message log behind the [`TranscriptStore`]
//! trait, with in-memory and JSONL-file backends, a strict record schema
//! at the boundary, live snapshot subscriptions, and the reconciliation
//! that turns unordered snapshots into one visible order.

pub mod memory;
pub mod reconcile;
pub mod record;
pub mod store;
pub mod transcript;

pub use memory::MemoryTranscriptStore;
pub use reconcile::{reconcile, TranscriptView};
pub use record::{normalize, RawRecord};
pub use store::{ChangeNotifier, Subscription, TranscriptSnapshot, TranscriptStore};
pub use transcript::JsonlTranscriptStore;
