//! # Muster Session
//! The temporal-coordination and attendee-state core: trigger rules,
//! the session state machine, the attendee registry, reminder fan-out,
//! and the command authorization gate.

pub mod dispatch;
pub mod gate;
pub mod registry;
pub mod session;
pub mod trigger;

#[cfg(test)]
pub(crate) mod testutil;
