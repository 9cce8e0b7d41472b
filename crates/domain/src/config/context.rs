use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context window
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Number of prior transcript messages sent with each request.
    #[serde(default = "d_10")]
    pub limit: usize,
    /// Replaces the built-in persona instruction when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            system_prompt: None,
        }
    }
}

fn d_10() -> usize {
    10
}
