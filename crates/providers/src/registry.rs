//! Backend construction.
//!
//! Reads the [`LlmConfig`], resolves authentication and instantiates the
//! adapter named by `kind`.

use std::sync::Arc;

use sr_domain::config::{BackendKind, LlmConfig};
use sr_domain::error::CompletionError;

use crate::canned::CannedBackend;
use crate::openai_compat::OpenAiCompatBackend;
use crate::traits::CompletionBackend;

/// Build the configured completion backend.
pub fn backend_from_config(config: &LlmConfig) -> Result<Arc<dyn CompletionBackend>, CompletionError> {
    let backend: Arc<dyn CompletionBackend> = match config.kind {
        BackendKind::OpenaiCompat => Arc::new(OpenAiCompatBackend::from_config(config)?),
        BackendKind::Canned => Arc::new(CannedBackend::from_config(config)),
    };

    tracing::info!(
        backend = backend.backend_id(),
        model = %config.model,
        "completion backend ready"
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_selects_adapter() {
        let canned = backend_from_config(&LlmConfig {
            kind: BackendKind::Canned,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(canned.backend_id(), "canned");

        let http = backend_from_config(&LlmConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(http.backend_id(), "openai_compat");
    }
}
