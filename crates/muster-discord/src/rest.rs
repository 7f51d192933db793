//! Discord REST transport — message primitives via Bot API v10.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;

use muster_core::error::{MusterError, Result};
use muster_core::traits::Transport;
use muster_core::types::{ChannelHandle, ChannelId, MessageId, RoleId, UserId};

const API_BASE: &str = "https://discord.com/api/v10";

/// Channel types that carry text: 0 = guild text, 5 = announcement.
fn is_text_capable(kind: u8) -> bool {
    matches!(kind, 0 | 5)
}

/// Percent-encode a reaction marker for use in an endpoint path.
fn encode_marker(marker: &str) -> String {
    marker
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

pub struct DiscordTransport {
    client: reqwest::Client,
    token: String,
    guild_id: String,
}

impl DiscordTransport {
    pub fn new(token: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            guild_id: guild_id.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{API_BASE}{path}")
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MusterError::Transport(format!("{what}: {status} {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| MusterError::Transport(format!("Invalid {what} response: {e}")))
    }

    /// Validate credentials (GET /users/@me).
    pub async fn connect(&self) -> Result<DiscordUser> {
        let response = self
            .client
            .get(self.url("/users/@me"))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| MusterError::Transport(format!("getMe failed: {e}")))?;
        Self::check(response, "getMe").await
    }

    /// Messages in a channel strictly after `after`, oldest first.
    /// Without a cursor, only the newest message is fetched (used to prime
    /// the command poller without replaying history).
    pub async fn fetch_messages_after(
        &self,
        channel: &ChannelHandle,
        after: Option<&MessageId>,
    ) -> Result<Vec<DiscordMessage>> {
        let mut request = self
            .client
            .get(self.url(&format!("/channels/{}/messages", channel.id())))
            .header("Authorization", self.auth());
        request = match after {
            Some(id) => request.query(&[("after", id.as_str()), ("limit", "100")]),
            None => request.query(&[("limit", "1")]),
        };
        let response = request
            .send()
            .await
            .map_err(|e| MusterError::Transport(format!("getMessages failed: {e}")))?;
        let mut messages: Vec<DiscordMessage> = Self::check(response, "getMessages").await?;
        // Discord returns newest first.
        messages.reverse();
        Ok(messages)
    }

    /// Users currently reacted with `marker`, paged via `after`.
    /// `Ok(None)` means the message no longer exists.
    pub async fn fetch_reactors(
        &self,
        channel: &ChannelHandle,
        message: &MessageId,
        marker: &str,
    ) -> Result<Option<Vec<DiscordUser>>> {
        let mut reactors = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(self.url(&format!(
                    "/channels/{}/messages/{}/reactions/{}",
                    channel.id(),
                    message,
                    encode_marker(marker)
                )))
                .header("Authorization", self.auth())
                .query(&[("limit", "100")]);
            if let Some(cursor) = &after {
                request = request.query(&[("after", cursor.as_str())]);
            }
            let response = request
                .send()
                .await
                .map_err(|e| MusterError::Transport(format!("getReactions failed: {e}")))?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let page: Vec<DiscordUser> = Self::check(response, "getReactions").await?;
            let full = page.len() == 100;
            after = page.last().map(|u| u.id.clone());
            reactors.extend(page);
            if !full {
                return Ok(Some(reactors));
            }
        }
    }

    async fn create_dm_channel(&self, user: &UserId) -> Result<DiscordChannel> {
        let body = serde_json::json!({ "recipient_id": user });
        let response = self
            .client
            .post(self.url("/users/@me/channels"))
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await
            .map_err(|e| MusterError::Transport(format!("createDM failed: {e}")))?;
        Self::check(response, "createDM").await
    }

    async fn post_to_channel_id(&self, channel_id: &str, content: &str) -> Result<MessageId> {
        let body = serde_json::json!({ "content": content });
        let response = self
            .client
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await
            .map_err(|e| MusterError::Transport(format!("sendMessage failed: {e}")))?;
        let message: DiscordMessage = Self::check(response, "sendMessage").await?;
        Ok(MessageId::new(message.id))
    }
}

#[async_trait]
impl Transport for DiscordTransport {
    async fn post_message(&self, channel: &ChannelHandle, content: &str) -> Result<MessageId> {
        self.post_to_channel_id(channel.id().as_str(), content).await
    }

    async fn delete_message(&self, channel: &ChannelHandle, message: &MessageId) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/channels/{}/messages/{}", channel.id(), message)))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| MusterError::Transport(format!("deleteMessage failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MusterError::Transport(format!("deleteMessage: {status}")));
        }
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel: &ChannelHandle,
        message: &MessageId,
        marker: &str,
    ) -> Result<()> {
        let response = self
            .client
            .put(self.url(&format!(
                "/channels/{}/messages/{}/reactions/{}/@me",
                channel.id(),
                message,
                encode_marker(marker)
            )))
            .header("Authorization", self.auth())
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| MusterError::Transport(format!("addReaction failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MusterError::Transport(format!("addReaction: {status}")));
        }
        Ok(())
    }

    async fn send_direct_message(&self, user: &UserId, content: &str) -> Result<()> {
        let dm = self.create_dm_channel(user).await?;
        self.post_to_channel_id(&dm.id, content).await?;
        Ok(())
    }

    async fn fetch_channel(&self, channel: &ChannelId) -> Result<ChannelHandle> {
        let response = self
            .client
            .get(self.url(&format!("/channels/{channel}")))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| MusterError::Transport(format!("getChannel failed: {e}")))?;
        let fetched: DiscordChannel = Self::check(response, "getChannel").await?;
        if !is_text_capable(fetched.kind) {
            return Err(MusterError::Transport(format!(
                "Channel {channel} is not text-capable (type {})",
                fetched.kind
            )));
        }
        Ok(ChannelHandle::new(channel.clone()))
    }

    async fn fetch_actor_roles(&self, actor: &UserId) -> Result<HashSet<RoleId>> {
        let response = self
            .client
            .get(self.url(&format!("/guilds/{}/members/{actor}", self.guild_id)))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| MusterError::Transport(format!("getMember failed: {e}")))?;
        let member: GuildMember = Self::check(response, "getMember").await?;
        Ok(member.roles.into_iter().map(RoleId::new).collect())
    }
}

// --- Discord API Types ---

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: Option<DiscordUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordChannel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_confirm_marker() {
        assert_eq!(encode_marker("\u{2705}"), "%E2%9C%85");
        assert_eq!(encode_marker("abc-123"), "abc-123");
    }

    #[test]
    fn test_text_capable_kinds() {
        assert!(is_text_capable(0));
        assert!(is_text_capable(5));
        assert!(!is_text_capable(2)); // voice
        assert!(!is_text_capable(4)); // category
    }

    #[test]
    fn test_parse_message_payload() {
        let message: DiscordMessage = serde_json::from_str(
            r#"{
                "id": "111",
                "content": "!announce <@222> 2000",
                "author": {"id": "333", "username": "op", "bot": false}
            }"#,
        )
        .unwrap();
        assert_eq!(message.id, "111");
        assert!(!message.author.unwrap().bot);
    }

    #[test]
    fn test_parse_member_roles() {
        let member: GuildMember =
            serde_json::from_str(r#"{"roles": ["1", "2"], "nick": "x"}"#).unwrap();
        assert_eq!(member.roles.len(), 2);
    }

    #[test]
    fn test_parse_channel_type() {
        let channel: DiscordChannel =
            serde_json::from_str(r#"{"id": "9", "type": 0, "name": "general"}"#).unwrap();
        assert!(is_text_capable(channel.kind));
    }
}
