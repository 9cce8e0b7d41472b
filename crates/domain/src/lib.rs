//! Shared types for the serene conversation core: the strict message
//! schema, error taxonomy, configuration tree and structured trace events.

pub mod config;
pub mod error;
pub mod message;
pub mod trace;

pub use message::{CreatedAt, Message, NewMessage, OwnerId, Role, Sender, WindowEntry};
