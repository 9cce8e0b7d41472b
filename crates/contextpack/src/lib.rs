pub mod builder;
pub mod persona;
pub mod report;

pub use builder::{build, ContextWindowBuilder, DEFAULT_LIMIT};
pub use persona::DEFAULT_SYSTEM_PROMPT;
pub use report::WindowReport;
