//! # Muster Core
//! Shared identity types, configuration, error taxonomy, and the
//! chat-transport trait used by every other muster crate.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
