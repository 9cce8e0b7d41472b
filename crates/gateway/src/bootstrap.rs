//! Runtime construction shared by `serve`, `run` and `chat`, so CLI
//! commands can boot the orchestrator without an HTTP listener.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;

use sr_contextpack::ContextWindowBuilder;
use sr_domain::config::{Config, ConfigSeverity, StoreBackend};
use sr_providers::backend_from_config;
use sr_safety::{CrisisDetector, PhraseList};
use sr_sessions::{JsonlTranscriptStore, MemoryTranscriptStore, TranscriptStore};

use crate::runtime::{CycleSettings, LoggingObserver, Orchestrator};
use crate::state::AppState;

/// How often idle session locks are forgotten.
const LOCK_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Validate config and wire store, detector, window builder and backend
/// into an [`Orchestrator`].
pub fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Transcript store ─────────────────────────────────────────────
    let buffer = config.sessions.subscription_buffer;
    let store: Arc<dyn TranscriptStore> = match config.sessions.backend {
        StoreBackend::Memory => {
            tracing::info!("in-memory transcript store ready");
            Arc::new(MemoryTranscriptStore::with_buffer(buffer))
        }
        StoreBackend::Jsonl => Arc::new(
            JsonlTranscriptStore::open(&config.sessions.state_path, buffer)
                .context("opening JSONL transcript store")?,
        ),
    };

    // ── Crisis detector ──────────────────────────────────────────────
    let phrases = PhraseList::from_config(&config.safety);
    tracing::info!(
        version = phrases.version(),
        phrases = phrases.len(),
        "crisis phrase list loaded"
    );

    // ── Completion backend ───────────────────────────────────────────
    let backend = backend_from_config(&config.llm).context("initializing completion backend")?;

    Ok(Orchestrator::new(store, backend, CycleSettings::from_config(config))
        .with_detector(CrisisDetector::new(phrases))
        .with_window_builder(ContextWindowBuilder::from_config(&config.context)))
}

/// Build the server's [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let orchestrator = build_orchestrator(&config)?.with_observer(Arc::new(LoggingObserver));
    Ok(AppState {
        config,
        orchestrator,
        started_at: Instant::now(),
    })
}

/// Spawn long-lived housekeeping loops for the server.
pub fn spawn_background_tasks(state: &AppState) {
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(LOCK_PRUNE_INTERVAL);
        tick.tick().await;
        loop {
            tick.tick().await;
            orchestrator.locks().prune_idle();
            tracing::debug!(
                tracked = orchestrator.locks().session_count(),
                "pruned idle session locks"
            );
        }
    });
}
