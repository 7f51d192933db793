//! Polling loops — operator command intake and reaction-signal synthesis.
//!
//! A REST-only bot has no gateway event stream, so commands are read by
//! polling the primary channel and confirmations by polling an
//! announcement's reactor list, diffing against the previously seen set
//! to synthesize add/remove signals.

use std::collections::HashSet;
use std::sync::Arc;

use muster_core::error::Result;
use muster_core::types::{ChannelHandle, MessageId, ReactionSignal, SignalKind, UserId};

use crate::rest::{DiscordMessage, DiscordTransport};

/// Reads new messages from the primary channel. Bot authors are skipped.
pub struct CommandPoller {
    transport: Arc<DiscordTransport>,
    channel: ChannelHandle,
    cursor: Option<MessageId>,
}

impl CommandPoller {
    pub fn new(transport: Arc<DiscordTransport>, channel: ChannelHandle) -> Self {
        Self {
            transport,
            channel,
            cursor: None,
        }
    }

    /// Advance the cursor to the newest message without processing it, so
    /// startup does not replay channel history as commands.
    pub async fn prime(&mut self) -> Result<()> {
        let latest = self
            .transport
            .fetch_messages_after(&self.channel, None)
            .await?;
        if let Some(message) = latest.last() {
            tracing::debug!("Command cursor primed at message {}", message.id);
            self.cursor = Some(MessageId::new(&*message.id));
        }
        Ok(())
    }

    /// Fetch messages newer than the cursor, oldest first.
    pub async fn poll(&mut self) -> Result<Vec<DiscordMessage>> {
        let messages = self
            .transport
            .fetch_messages_after(&self.channel, self.cursor.as_ref())
            .await?;
        if let Some(message) = messages.last() {
            self.cursor = Some(MessageId::new(&*message.id));
        }
        Ok(messages
            .into_iter()
            .filter(|m| m.author.as_ref().is_some_and(|a| !a.bot))
            .collect())
    }
}

/// Watches one announcement's ✅ reactors and synthesizes attendance
/// signals from set differences between polls.
pub struct ReactionWatcher {
    transport: Arc<DiscordTransport>,
    channel: ChannelHandle,
    message: MessageId,
    marker: String,
    seen: HashSet<UserId>,
}

impl ReactionWatcher {
    pub fn new(
        transport: Arc<DiscordTransport>,
        channel: ChannelHandle,
        message: MessageId,
        marker: &str,
    ) -> Self {
        Self {
            transport,
            channel,
            message,
            marker: marker.to_string(),
            seen: HashSet::new(),
        }
    }

    pub fn message(&self) -> &MessageId {
        &self.message
    }

    /// One poll pass. `Ok(None)` means the watched message is gone and the
    /// subscription is over.
    pub async fn poll(&mut self) -> Result<Option<Vec<ReactionSignal>>> {
        let Some(reactors) = self
            .transport
            .fetch_reactors(&self.channel, &self.message, &self.marker)
            .await?
        else {
            return Ok(None);
        };
        let current: HashSet<UserId> = reactors
            .into_iter()
            .filter(|u| !u.bot)
            .map(|u| UserId::new(u.id))
            .collect();
        Ok(Some(diff_reactors(&mut self.seen, current, &self.message)))
    }
}

/// Turn the delta between the previously seen reactor set and the current
/// one into Added/Removed signals, updating `seen` in place.
fn diff_reactors(
    seen: &mut HashSet<UserId>,
    current: HashSet<UserId>,
    message: &MessageId,
) -> Vec<ReactionSignal> {
    let mut signals = Vec::new();
    for user in current.difference(seen) {
        signals.push(ReactionSignal {
            message: message.clone(),
            user: user.clone(),
            kind: SignalKind::Added,
        });
    }
    for user in seen.difference(&current) {
        signals.push(ReactionSignal {
            message: message.clone(),
            user: user.clone(),
            kind: SignalKind::Removed,
        });
    }
    *seen = current;
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> HashSet<UserId> {
        ids.iter().map(|i| UserId::new(*i)).collect()
    }

    #[test]
    fn test_diff_initial_adds() {
        let mut seen = HashSet::new();
        let message = MessageId::new("m1");
        let signals = diff_reactors(&mut seen, ids(&["1", "2"]), &message);
        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|s| s.kind == SignalKind::Added));
        assert_eq!(seen, ids(&["1", "2"]));
    }

    #[test]
    fn test_diff_mixed_add_remove() {
        let mut seen = ids(&["1", "2"]);
        let message = MessageId::new("m1");
        let signals = diff_reactors(&mut seen, ids(&["2", "3"]), &message);
        let added: Vec<_> = signals
            .iter()
            .filter(|s| s.kind == SignalKind::Added)
            .collect();
        let removed: Vec<_> = signals
            .iter()
            .filter(|s| s.kind == SignalKind::Removed)
            .collect();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].user, UserId::new("3"));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].user, UserId::new("1"));
        assert_eq!(seen, ids(&["2", "3"]));
    }

    #[test]
    fn test_diff_no_change_is_quiet() {
        let mut seen = ids(&["1"]);
        let message = MessageId::new("m1");
        assert!(diff_reactors(&mut seen, ids(&["1"]), &message).is_empty());
    }
}
