//! `serene run`: one-shot command.
//!
//! Stores a single message, waits for the cycle to end, prints the reply
//! and exits.  Useful for scripting and smoke-testing a backend.

use std::sync::Arc;

use sr_domain::config::Config;
use sr_domain::OwnerId;
use sr_safety::{crisis_resources, EMERGENCY_GUIDANCE};

use crate::bootstrap;
use crate::runtime::Resolution;

/// Run one cycle and print the outcome.
///
/// Exits with code 1 when the cycle was abandoned (nothing could be
/// stored as the reply).
pub async fn run(
    config: Arc<Config>,
    message: String,
    session: String,
    json_output: bool,
) -> anyhow::Result<()> {
    let orchestrator = bootstrap::build_orchestrator(&config)?;
    let owner = OwnerId::new(session);

    let handle = orchestrator.submit(&owner, &message).await?;
    let outcome = handle
        .outcome()
        .await
        .ok_or_else(|| anyhow::anyhow!("cycle ended without an outcome"))?;

    if json_output {
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| anyhow::anyhow!("serializing outcome: {e}"))?;
        println!("{json}");
    } else {
        if outcome.crisis.matched {
            eprintln!("\x1b[33m{EMERGENCY_GUIDANCE}\x1b[0m");
            for resource in crisis_resources() {
                eprintln!("\x1b[33m  {}\x1b[0m", resource.summary());
            }
        }
        if let Some(reply) = &outcome.reply {
            println!("{}", reply.text);
        }
        if let Resolution::FallbackResolved { kind } = &outcome.resolution {
            eprintln!("\x1b[2m(backend failed: {kind})\x1b[0m");
        }
    }

    if outcome.resolution == Resolution::Abandoned {
        eprintln!("error: no reply could be stored");
        std::process::exit(1);
    }

    Ok(())
}
