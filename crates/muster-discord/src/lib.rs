//! # Muster Discord
//! Discord REST (Bot API v10) implementation of the muster transport,
//! plus the polling loops that stand in for a gateway connection.

pub mod poll;
pub mod rest;

pub use poll::{CommandPoller, ReactionWatcher};
pub use rest::DiscordTransport;
