use std::sync::Arc;
use std::time::Instant;

use sr_domain::config::Config;

use crate::runtime::Orchestrator;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Orchestrator,
    pub started_at: Instant,
}
