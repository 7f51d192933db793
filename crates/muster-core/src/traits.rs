//! The chat-transport trait — the boundary to the outward messaging API.
//!
//! The session core never talks HTTP; it calls these primitives. The
//! concrete Discord implementation lives in `muster-discord`, and tests
//! substitute an in-memory double.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::types::{ChannelHandle, ChannelId, MessageId, RoleId, UserId};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Post a message to a channel, returning its identity.
    async fn post_message(&self, channel: &ChannelHandle, content: &str) -> Result<MessageId>;

    /// Delete a previously posted message. Callers swallow and log the
    /// failure wherever a dangling message is merely cosmetic.
    async fn delete_message(&self, channel: &ChannelHandle, message: &MessageId) -> Result<()>;

    /// Attach a reaction marker to a message (the attendance affordance).
    async fn add_reaction(
        &self,
        channel: &ChannelHandle,
        message: &MessageId,
        marker: &str,
    ) -> Result<()>;

    /// Deliver a direct message to a single user.
    async fn send_direct_message(&self, user: &UserId, content: &str) -> Result<()>;

    /// Resolve a channel id into a text-capable handle. Fails when the
    /// channel does not exist or cannot carry text messages.
    async fn fetch_channel(&self, channel: &ChannelId) -> Result<ChannelHandle>;

    /// Fetch the set of guild roles held by an actor.
    async fn fetch_actor_roles(&self, actor: &UserId) -> Result<HashSet<RoleId>>;
}
