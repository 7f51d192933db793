//! Identity types shared across crates.
//!
//! Discord snowflakes travel as strings on the wire, so each identity is a
//! thin newtype over `String`. They exist to keep user, role, channel and
//! message handles from being mixed up at the seams.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

id_type!(
    /// A user identity.
    UserId
);
id_type!(
    /// A guild role identity.
    RoleId
);
id_type!(
    /// A channel identity.
    ChannelId
);
id_type!(
    /// The identity of a posted message. Doubles as the correlation key for
    /// reaction signals and announcement replacement.
    MessageId
);

/// Handle to a channel that has been verified text-capable.
///
/// Only transports construct these, after checking the channel type once at
/// fetch time. Everything downstream can post without re-checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    id: ChannelId,
}

impl ChannelHandle {
    /// Wrap a channel id. Callers must have verified the channel accepts
    /// text messages; see `Transport::fetch_channel`.
    pub fn new(id: ChannelId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }
}

/// An attendance-confirmation signal derived from a reaction add/remove
/// event on an announcement message.
#[derive(Debug, Clone)]
pub struct ReactionSignal {
    /// The announcement the reaction landed on.
    pub message: MessageId,
    pub user: UserId,
    pub kind: SignalKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Added,
    Removed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_is_raw() {
        let id = UserId::new("1140792087604891799");
        assert_eq!(format!("<@{id}>"), "<@1140792087604891799>");
    }

    #[test]
    fn test_ids_hash_by_value() {
        let mut set = std::collections::HashSet::new();
        set.insert(UserId::new("1"));
        set.insert(UserId::new("1"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_serde_transparent() {
        let id: MessageId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(id, MessageId::new("42"));
    }
}
