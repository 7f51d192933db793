//! Bot runtime — wires the transport polling loops, the authorization
//! gate, the session coordinator, and the standing trigger rules.

use chrono::{Datelike, Duration as ChronoDuration, Local};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use muster_core::error::Result;
use muster_core::traits::Transport;
use muster_core::types::{ChannelHandle, MessageId, UserId};
use muster_discord::{CommandPoller, DiscordTransport, ReactionWatcher};
use muster_session::gate::CommandGate;
use muster_session::session::{CONFIRM_MARKER, OneShot, SessionCoordinator};
use muster_session::trigger::{self, Tick, standing_rules};

use crate::commands::{Command, parse_command};

/// How often the primary channel is polled for commands.
const COMMAND_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// How often an announcement's reactors are polled.
const REACTION_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Lifetime of transient replies (usage errors, confirmations).
const TEMP_REPLY_TTL: Duration = Duration::from_secs(5);
/// Lifetime of the `!test` preview.
const PREVIEW_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct Runtime {
    transport: Arc<DiscordTransport>,
    coordinator: Arc<Mutex<SessionCoordinator>>,
    gate: CommandGate,
    channel: ChannelHandle,
    mention_everyone: bool,
}

impl Runtime {
    pub fn new(
        transport: Arc<DiscordTransport>,
        coordinator: Arc<Mutex<SessionCoordinator>>,
        gate: CommandGate,
        channel: ChannelHandle,
        mention_everyone: bool,
    ) -> Self {
        Self {
            transport,
            coordinator,
            gate,
            channel,
            mention_everyone,
        }
    }

    /// Spawn one self-rearming timer task per standing rule. The tasks
    /// live for the life of the process.
    pub fn spawn_rule_timers(&self) {
        for rule in standing_rules() {
            let runtime = self.clone();
            tokio::spawn(async move {
                loop {
                    let now = Local::now().naive_local();
                    let next = rule.next_after(now);
                    let Some(wait) = trigger::delay_until(next, now) else {
                        // next_after is strictly future; guard anyway
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        continue;
                    };
                    tracing::info!("Rule '{}' armed for {next}", rule.name);
                    tokio::time::sleep(wait).await;
                    runtime.run_tick(rule.tick).await;
                }
            });
        }
    }

    async fn run_tick(&self, tick: Tick) {
        let now = Local::now().naive_local();
        tracing::info!("Tick fired: {tick:?}");
        match tick {
            Tick::MorningReset => {
                let time = trigger::default_session_time(now);
                self.announce_session(time, None).await;
            }
            Tick::AfternoonReannounce => {
                self.announce_session("15:00", None).await;
            }
            Tick::EveningReminder => {
                let report = self.coordinator.lock().await.remind().await;
                if !report.skipped() {
                    tracing::info!(
                        "Evening reminders: {} sent, {} failed",
                        report.sent,
                        report.failed
                    );
                }
                if trigger::is_weekend(now.weekday()) {
                    self.announce_session("20:00", None).await;
                }
            }
        }
    }

    /// Announce (replacing any live session), attach a reaction watcher,
    /// and arm the delayed start for the declared time. Failures are
    /// logged; automatic ticks have nobody to report to.
    async fn announce_session(&self, time: &str, host: Option<UserId>) -> bool {
        let outcome = {
            let mut coordinator = self.coordinator.lock().await;
            coordinator.announce(time, host, self.mention_everyone).await
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Announce for {time} failed: {e}");
                return false;
            }
        };
        self.spawn_reaction_watcher(outcome.message.clone());

        // Arm the start for today at the declared time; a time already in
        // the past arms nothing.
        let now = Local::now().naive_local();
        if let Some(at) = trigger::parse_hhmm(time).map(|t| now.date().and_time(t))
            && let Some(delay) = trigger::delay_until(at, now)
        {
            // Keyed to the announce outcome's epoch: if another announce
            // replaced the session since the lock was released, the entry
            // is stale and fire() skips it.
            let token = self
                .coordinator
                .lock()
                .await
                .arm_for(outcome.epoch, OneShot::StartSession, at);
            let runtime = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let fired = {
                    let mut coordinator = runtime.coordinator.lock().await;
                    coordinator.fire(token).await
                };
                match fired {
                    Ok(Some(report)) => tracing::info!(
                        "Scheduled start: {} reminders sent, {} failed",
                        report.sent,
                        report.failed
                    ),
                    Ok(None) => {}
                    Err(e) => tracing::error!("Scheduled start failed: {e}"),
                }
            });
        }
        true
    }

    /// Poll the announcement's reactors until the message is deleted or
    /// superseded, feeding signals into the coordinator. Stale signals are
    /// dropped there by identity.
    fn spawn_reaction_watcher(&self, message: MessageId) {
        let mut watcher = ReactionWatcher::new(
            self.transport.clone(),
            self.channel.clone(),
            message.clone(),
            CONFIRM_MARKER,
        );
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(REACTION_POLL_INTERVAL).await;
                match watcher.poll().await {
                    Ok(Some(signals)) => {
                        let mut coordinator = coordinator.lock().await;
                        if coordinator.announcement() != Some(watcher.message()) {
                            break; // superseded, subscription over
                        }
                        for signal in &signals {
                            coordinator.apply_signal(signal);
                        }
                    }
                    Ok(None) => break, // message deleted
                    Err(e) => {
                        tracing::warn!("Reaction poll failed: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
            tracing::debug!("Reaction watcher for {message} ended");
        });
    }

    /// The command intake loop. Runs until the process exits.
    pub async fn run(&self) -> Result<()> {
        let mut poller = CommandPoller::new(self.transport.clone(), self.channel.clone());
        poller.prime().await?;
        tracing::info!("Command loop started");

        let mut interval = tokio::time::interval(COMMAND_POLL_INTERVAL);
        loop {
            interval.tick().await;
            let messages = match poller.poll().await {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!("Command poll failed: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };
            for message in messages {
                let Some(author) = message.author.as_ref().map(|a| UserId::new(&*a.id)) else {
                    continue;
                };
                match parse_command(&message.content) {
                    Some(Ok(command)) => self.handle_command(&author, command).await,
                    Some(Err(usage)) => self.temp_reply(usage).await,
                    None => {}
                }
            }
        }
    }

    async fn handle_command(&self, author: &UserId, command: Command) {
        let roles = match self.transport.fetch_actor_roles(author).await {
            Ok(roles) => roles,
            Err(e) => {
                tracing::warn!("Role lookup for {author} failed: {e}");
                return;
            }
        };
        if !self.gate.admit(&roles) {
            self.temp_reply("\u{274C} You do not have permission to use this command.")
                .await;
            return;
        }

        match command {
            Command::Announce { host, time } => {
                let time = match trigger::normalize_time(&time) {
                    Ok(time) => time,
                    Err(_) => {
                        self.temp_reply("Invalid time format (use HHMM or HH:MM)").await;
                        return;
                    }
                };
                if self.announce_session(&time, Some(host)).await {
                    self.temp_reply("Session announced!").await;
                } else {
                    self.temp_reply("An error occurred while processing the command.")
                        .await;
                }
            }
            Command::Start => {
                let result = {
                    let mut coordinator = self.coordinator.lock().await;
                    coordinator.start().await
                };
                match result {
                    Ok(report) if report.skipped() => {
                        self.temp_reply(
                            "\u{26A0} No users have confirmed \u{2705} for this session.",
                        )
                        .await;
                    }
                    Ok(report) => {
                        self.temp_reply(&format!(
                            "\u{2705} Sent DM reminders to **{}** users ({} failed).",
                            report.sent, report.failed
                        ))
                        .await;
                    }
                    Err(e) => {
                        tracing::error!("Start session failed: {e}");
                        self.temp_reply("\u{274C} An error occurred while starting the session.")
                            .await;
                    }
                }
            }
            Command::Test => {
                let posted = {
                    let coordinator = self.coordinator.lock().await;
                    coordinator.test_preview(author).await
                };
                match posted {
                    Ok(preview) => {
                        let at = Local::now().naive_local()
                            + ChronoDuration::seconds(PREVIEW_TTL.as_secs() as i64);
                        let token = {
                            let mut coordinator = self.coordinator.lock().await;
                            coordinator.arm(OneShot::DeletePreview(preview), at)
                        };
                        let runtime = self.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(PREVIEW_TTL).await;
                            let mut coordinator = runtime.coordinator.lock().await;
                            if let Err(e) = coordinator.fire(token).await {
                                tracing::warn!("Preview cleanup failed: {e}");
                            }
                        });
                        self.temp_reply("Test message sent!").await;
                    }
                    Err(e) => {
                        tracing::error!("Test preview failed: {e}");
                        self.temp_reply("An error occurred while processing the command.")
                            .await;
                    }
                }
            }
            Command::Reset => {
                self.coordinator.lock().await.reset().await;
                self.temp_reply("Session reset.").await;
            }
        }
    }

    /// Post a transient notice and delete it after a few seconds. Both
    /// failures are cosmetic and only logged.
    async fn temp_reply(&self, content: &str) {
        match self.transport.post_message(&self.channel, content).await {
            Ok(message) => {
                let runtime = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(TEMP_REPLY_TTL).await;
                    if let Err(e) = runtime
                        .transport
                        .delete_message(&runtime.channel, &message)
                        .await
                    {
                        tracing::debug!("Failed to delete transient reply: {e}");
                    }
                });
            }
            Err(e) => tracing::warn!("Failed to post transient reply: {e}"),
        }
    }
}
