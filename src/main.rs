//! # Muster — session announcement bot
//!
//! Posts recurring session announcements to a Discord channel, collects
//! ✅ attendance confirmations, DMs reminders when the session starts,
//! and resets for the next occurrence.
//!
//! Usage:
//!   muster                         # config from ~/.muster/config.toml
//!   muster --config ./muster.toml  # explicit config path
//!   muster --verbose               # debug logging

mod commands;
mod runtime;

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use muster_core::config::MusterConfig;
use muster_core::traits::Transport;
use muster_core::types::{ChannelId, RoleId};
use muster_discord::DiscordTransport;
use muster_session::gate::CommandGate;
use muster_session::session::SessionCoordinator;

#[derive(Parser)]
#[command(
    name = "muster",
    version,
    about = "\u{1F4E3} Muster — session announcement & reminder bot"
)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "~/.muster/config.toml")]
    config: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "muster=debug,muster_session=debug,muster_discord=debug"
    } else {
        "muster=info,muster_session=info,muster_discord=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Config is fatal when missing or incomplete
    let config_path = shellexpand::tilde(&cli.config).to_string();
    let config = MusterConfig::load_from(Path::new(&config_path))?;

    let transport = Arc::new(DiscordTransport::new(
        &config.discord.token,
        &config.community.guild_id,
    ));

    // Validate credentials and the primary channel before anything runs
    let me = transport.connect().await?;
    tracing::info!(
        "Logged in as {} ({})",
        me.username.as_deref().unwrap_or("unknown"),
        me.id
    );
    let channel = transport
        .fetch_channel(&ChannelId::new(&*config.community.channel_id))
        .await?;

    let coordinator = Arc::new(Mutex::new(SessionCoordinator::new(
        transport.clone() as Arc<dyn Transport>,
        channel.clone(),
        config.session.join_link.clone(),
    )));
    let gate = CommandGate::new(RoleId::new(&*config.community.admin_role_id));

    let runtime = runtime::Runtime::new(
        transport,
        coordinator,
        gate,
        channel,
        config.session.mention_everyone,
    );

    println!("\u{1F4E3} Muster v{}", env!("CARGO_PKG_VERSION"));
    println!("   Channel: {}", config.community.channel_id);
    println!("   Guild:   {}", config.community.guild_id);

    runtime.spawn_rule_timers();
    runtime.run().await?;
    Ok(())
}
