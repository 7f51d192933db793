//! Session state machine — announce, collect confirmations, start, reset.
//!
//! The coordinator owns the singleton session and its attendee registry.
//! At most one session is ever announced or started: announcing while one
//! is active deletes the old announcement and wipes its confirmations
//! before the new announcement exists, and every replacement bumps an
//! epoch counter so late signals and timers for the old session become
//! checked no-ops.

use chrono::NaiveDateTime;
use std::sync::Arc;

use muster_core::error::Result;
use muster_core::traits::Transport;
use muster_core::types::{ChannelHandle, MessageId, ReactionSignal, SignalKind, UserId};

use crate::dispatch::{self, ReminderReport};
use crate::registry::AttendeeRegistry;

/// The attendance-confirmation affordance on announcements.
pub const CONFIRM_MARKER: &str = "\u{2705}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Announced,
    Started,
}

/// A one-off delayed action armed against the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneShot {
    /// Start the session at its declared time.
    StartSession,
    /// Delete a test preview message.
    DeletePreview(MessageId),
}

/// Entry in the inspectable timer table. A firing timer whose epoch no
/// longer matches the live session is skipped.
#[derive(Debug, Clone)]
pub struct ArmedAction {
    pub token: u64,
    pub epoch: u64,
    pub at: NaiveDateTime,
    pub kind: OneShot,
}

/// Identity of a freshly posted announcement, handed back so the runtime
/// can attach a reaction watcher and arm the delayed start.
#[derive(Debug, Clone)]
pub struct AnnounceOutcome {
    pub message: MessageId,
    pub epoch: u64,
}

pub struct SessionCoordinator {
    transport: Arc<dyn Transport>,
    channel: ChannelHandle,
    join_link: String,
    state: SessionState,
    announcement: Option<MessageId>,
    declared_time: Option<String>,
    host: Option<UserId>,
    registry: AttendeeRegistry,
    epoch: u64,
    armed: Vec<ArmedAction>,
    next_token: u64,
}

impl SessionCoordinator {
    pub fn new(transport: Arc<dyn Transport>, channel: ChannelHandle, join_link: String) -> Self {
        Self {
            transport,
            channel,
            join_link,
            state: SessionState::Idle,
            announcement: None,
            declared_time: None,
            host: None,
            registry: AttendeeRegistry::new(),
            epoch: 0,
            armed: Vec::new(),
            next_token: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn announcement(&self) -> Option<&MessageId> {
        self.announcement.as_ref()
    }

    pub fn declared_time(&self) -> Option<&str> {
        self.declared_time.as_deref()
    }

    pub fn attendee_count(&self) -> usize {
        self.registry.len()
    }

    pub fn armed_actions(&self) -> &[ArmedAction] {
        &self.armed
    }

    /// Announce a session for `time` (already validated and canonical).
    /// Replacement is unconditional: the previous announcement, its
    /// confirmations, and its pending start timer are discarded first.
    pub async fn announce(
        &mut self,
        time: &str,
        host: Option<UserId>,
        mention_everyone: bool,
    ) -> Result<AnnounceOutcome> {
        self.discard_current().await;

        let content = render_announcement(time, host.as_ref(), mention_everyone);
        let message = self.transport.post_message(&self.channel, &content).await?;
        if let Err(e) = self
            .transport
            .add_reaction(&self.channel, &message, CONFIRM_MARKER)
            .await
        {
            tracing::warn!("Failed to attach confirm marker to {message}: {e}");
        }

        tracing::info!("Session announced for {time} (message {message})");
        self.announcement = Some(message.clone());
        self.declared_time = Some(time.to_string());
        self.host = host;
        self.state = SessionState::Announced;
        Ok(AnnounceOutcome {
            message,
            epoch: self.epoch,
        })
    }

    /// Record a confirmation. No-op unless a session is announced.
    pub fn confirm(&mut self, user: UserId) {
        if self.state == SessionState::Announced {
            self.registry.add(user);
        }
    }

    /// Withdraw a confirmation. No-op unless a session is announced.
    pub fn unconfirm(&mut self, user: &UserId) {
        if self.state == SessionState::Announced {
            self.registry.remove(user);
        }
    }

    /// Apply an external reaction signal. Signals carrying a message
    /// identity other than the live announcement are discarded; they
    /// belong to a replaced session.
    pub fn apply_signal(&mut self, signal: &ReactionSignal) {
        if self.announcement.as_ref() != Some(&signal.message) {
            tracing::debug!("Discarding stale reaction signal for {}", signal.message);
            return;
        }
        match signal.kind {
            SignalKind::Added => self.confirm(signal.user.clone()),
            SignalKind::Removed => self.unconfirm(&signal.user),
        }
    }

    /// Start the session: DM every confirmed attendee, then broadcast the
    /// start message. Safe to call with an empty registry, in which case
    /// the fan-out is skipped and the report says so.
    pub async fn start(&mut self) -> Result<ReminderReport> {
        let snapshot = self.registry.snapshot();
        let report = if snapshot.is_empty() {
            tracing::info!("Session starting with no confirmations; reminder fan-out skipped");
            ReminderReport::default()
        } else {
            let link = self.join_link.clone();
            let report = dispatch::fan_out(self.transport.as_ref(), &snapshot, |user| {
                render_reminder(user, &link)
            })
            .await;
            tracing::info!(
                "Reminder fan-out: {} sent, {} failed of {}",
                report.sent,
                report.failed,
                report.attempted
            );
            report
        };

        let broadcast = render_start_broadcast(&self.join_link);
        self.transport.post_message(&self.channel, &broadcast).await?;
        self.state = SessionState::Started;
        Ok(report)
    }

    /// The scheduled reminder pass: fan out over current confirmations
    /// without any state transition.
    pub async fn remind(&mut self) -> ReminderReport {
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            return ReminderReport::default();
        }
        let link = self.join_link.clone();
        dispatch::fan_out(self.transport.as_ref(), &snapshot, |user| {
            render_reminder(user, &link)
        })
        .await
    }

    /// Delete the current announcement if present, clear confirmations,
    /// and return to idle.
    pub async fn reset(&mut self) {
        self.discard_current().await;
    }

    /// Post a formatting preview: no mass mention, no state change. The
    /// caller arms a delayed deletion for the returned message.
    pub async fn test_preview(&self, actor: &UserId) -> Result<MessageId> {
        let content = render_announcement("20:00", Some(actor), false);
        let message = self.transport.post_message(&self.channel, &content).await?;
        if let Err(e) = self
            .transport
            .add_reaction(&self.channel, &message, CONFIRM_MARKER)
            .await
        {
            tracing::warn!("Failed to attach confirm marker to preview {message}: {e}");
        }
        Ok(message)
    }

    /// Arm a one-off delayed action against the current session. Returns
    /// the token to pass to [`fire`](Self::fire) when the delay elapses.
    pub fn arm(&mut self, kind: OneShot, at: NaiveDateTime) -> u64 {
        self.arm_for(self.epoch, kind, at)
    }

    /// Arm a one-off against a specific announcement epoch, normally the
    /// one carried in an [`AnnounceOutcome`]. Callers that release the
    /// coordinator between announcing and arming must use this form: if a
    /// replacement slipped in between, the entry lands under the ended
    /// session's epoch and [`fire`](Self::fire) skips it.
    pub fn arm_for(&mut self, epoch: u64, kind: OneShot, at: NaiveDateTime) -> u64 {
        self.next_token += 1;
        self.armed.push(ArmedAction {
            token: self.next_token,
            epoch,
            at,
            kind,
        });
        self.next_token
    }

    /// Fire a previously armed action. Entries retired by a replacement or
    /// reset, and start timers whose epoch no longer matches, are no-ops.
    pub async fn fire(&mut self, token: u64) -> Result<Option<ReminderReport>> {
        let Some(pos) = self.armed.iter().position(|a| a.token == token) else {
            return Ok(None);
        };
        let action = self.armed.remove(pos);
        match action.kind {
            OneShot::StartSession => {
                if action.epoch != self.epoch || self.state != SessionState::Announced {
                    tracing::debug!("Skipping stale session-start timer (epoch {})", action.epoch);
                    return Ok(None);
                }
                self.start().await.map(Some)
            }
            OneShot::DeletePreview(message) => {
                if let Err(e) = self.transport.delete_message(&self.channel, &message).await {
                    tracing::warn!("Failed to delete preview {message}: {e}");
                }
                Ok(None)
            }
        }
    }

    /// End the current session. The announcement identity is cleared and
    /// the registry wiped before any suspension point, so a racing signal
    /// can never be attributed to the wrong session.
    async fn discard_current(&mut self) {
        let stale = self.announcement.take();
        self.registry.clear();
        self.declared_time = None;
        self.host = None;
        self.state = SessionState::Idle;
        self.epoch += 1;

        // Retire start timers armed for the ended session. Their sleepers
        // may still fire, but the table entry is gone.
        let epoch = self.epoch;
        self.armed
            .retain(|a| !(a.kind == OneShot::StartSession && a.epoch < epoch));

        if let Some(message) = stale {
            if let Err(e) = self.transport.delete_message(&self.channel, &message).await {
                // Cosmetic: the dangling message stays, the new session is unaffected.
                tracing::warn!("Failed to delete announcement {message}: {e}");
            }
        }
    }
}

fn render_announcement(time: &str, host: Option<&UserId>, mention_everyone: bool) -> String {
    let mut lines = vec!["**\u{1F4E3} | Session**".to_string()];
    if let Some(host) = host {
        lines.push(format!("> Host: <@{host}>"));
    }
    lines.push(format!("> Time: {time}"));
    if mention_everyone {
        lines.push("> Ping: @everyone".to_string());
    }
    lines.push(String::new());
    lines.push(format!(
        "Confirm your attendance by reacting with {CONFIRM_MARKER}."
    ));
    lines.join("\n")
}

fn render_reminder(user: &UserId, link: &str) -> String {
    let mut text = format!(
        "**Session | Reminder**\n\n<@{user}> you reacted {CONFIRM_MARKER} to a session earlier. \
         The session is now starting."
    );
    if !link.is_empty() {
        text.push_str(&format!("\nJoin here: {link}"));
    }
    text
}

fn render_start_broadcast(link: &str) -> String {
    if link.is_empty() {
        "@everyone The session has now started.".to_string()
    } else {
        format!("@everyone The session has now started, join here: {link}")
    }
}
