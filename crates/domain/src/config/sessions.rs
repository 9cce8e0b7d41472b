use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transcript store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local; transcripts vanish on exit.
    #[default]
    Memory,
    /// One append-only `<owner>.jsonl` file per session under `state_path`.
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Extra attempts for the reply/fallback append when the store fails.
    #[serde(default = "d_2")]
    pub terminal_append_retries: u32,
    /// Snapshots buffered per live subscription before the feed waits.
    #[serde(default = "d_32")]
    pub subscription_buffer: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            state_path: d_state_path(),
            terminal_append_retries: 2,
            subscription_buffer: 32,
        }
    }
}

fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}

fn d_2() -> u32 {
    2
}

fn d_32() -> usize {
    32
}
