pub mod canned;
pub mod openai_compat;
pub mod registry;
pub mod traits;
pub(crate) mod util;

// Re-exports for convenience.
pub use canned::CannedBackend;
pub use openai_compat::OpenAiCompatBackend;
pub use registry::backend_from_config;
pub use traits::{CompletionBackend, CompletionRequest};
