//! In-memory transport double for coordinator and dispatcher tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use muster_core::error::{MusterError, Result};
use muster_core::traits::Transport;
use muster_core::types::{ChannelHandle, ChannelId, MessageId, RoleId, UserId};

#[derive(Default)]
pub struct MockTransport {
    /// (message id, content) of every posted message, in order.
    pub posted: Mutex<Vec<(MessageId, String)>>,
    pub deleted: Mutex<Vec<MessageId>>,
    /// (message id, marker) of every attached reaction.
    pub reactions: Mutex<Vec<(MessageId, String)>>,
    /// (user id, content) of every delivered DM.
    pub dms: Mutex<Vec<(UserId, String)>>,
    fail_dms: Mutex<HashSet<UserId>>,
    fail_deletes: Mutex<bool>,
    next_id: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_dm_for(&self, user: UserId) {
        self.fail_dms.lock().unwrap().insert(user);
    }

    pub fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    pub fn channel() -> ChannelHandle {
        ChannelHandle::new(ChannelId::new("primary"))
    }

    pub fn last_posted(&self) -> Option<(MessageId, String)> {
        self.posted.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_message(&self, _channel: &ChannelHandle, content: &str) -> Result<MessageId> {
        let id = MessageId::new(format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.posted
            .lock()
            .unwrap()
            .push((id.clone(), content.to_string()));
        Ok(id)
    }

    async fn delete_message(&self, _channel: &ChannelHandle, message: &MessageId) -> Result<()> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(MusterError::Transport("delete refused".into()));
        }
        self.deleted.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel: &ChannelHandle,
        message: &MessageId,
        marker: &str,
    ) -> Result<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((message.clone(), marker.to_string()));
        Ok(())
    }

    async fn send_direct_message(&self, user: &UserId, content: &str) -> Result<()> {
        if self.fail_dms.lock().unwrap().contains(user) {
            return Err(MusterError::Transport(format!("{user} unreachable")));
        }
        self.dms
            .lock()
            .unwrap()
            .push((user.clone(), content.to_string()));
        Ok(())
    }

    async fn fetch_channel(&self, channel: &ChannelId) -> Result<ChannelHandle> {
        Ok(ChannelHandle::new(channel.clone()))
    }

    async fn fetch_actor_roles(&self, _actor: &UserId) -> Result<HashSet<RoleId>> {
        Ok(HashSet::new())
    }
}
