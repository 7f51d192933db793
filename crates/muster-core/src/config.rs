//! Muster configuration system.
//!
//! Loaded once at process start from a TOML file; the bot token may also
//! come from the `DISCORD_TOKEN` environment variable. A missing required
//! value is a fatal startup condition, not a runtime error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MusterError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusterConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    pub community: CommunityConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Transport credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Overridden by `DISCORD_TOKEN` when set.
    #[serde(default)]
    pub token: String,
}

/// Where the bot operates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityConfig {
    /// Guild the member role lookups run against.
    pub guild_id: String,
    /// Primary channel for announcements and commands.
    pub channel_id: String,
    /// Role required to use privileged commands.
    pub admin_role_id: String,
}

/// Session presentation knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Link delivered in reminders and the start broadcast.
    #[serde(default)]
    pub join_link: String,
    /// Whether real announcements ping @everyone.
    #[serde(default = "bool_true")]
    pub mention_everyone: bool,
}

fn bool_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            join_link: String::new(),
            mention_everyone: true,
        }
    }
}

impl MusterConfig {
    /// Load config from a specific path, apply the env token override,
    /// and validate required values.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MusterError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| MusterError::Config(format!("Failed to parse config: {e}")))?;
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            config.discord.token = token;
        }
        config.validate()?;
        Ok(config)
    }

    /// Get the default config path (~/.muster/config.toml).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".muster")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        let required = [
            (&self.discord.token, "discord.token (or DISCORD_TOKEN)"),
            (&self.community.guild_id, "community.guild_id"),
            (&self.community.channel_id, "community.channel_id"),
            (&self.community.admin_role_id, "community.admin_role_id"),
        ];
        for (value, name) in required {
            if value.trim().is_empty() {
                return Err(MusterError::Config(format!("{name} is not set")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<MusterConfig> {
        let config: MusterConfig = toml::from_str(toml_str)
            .map_err(|e| MusterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_full_config_parses() {
        let config = parse(
            r#"
            [discord]
            token = "abc"

            [community]
            guild_id = "1"
            channel_id = "2"
            admin_role_id = "3"

            [session]
            join_link = "https://example.com/join"
            mention_everyone = false
            "#,
        )
        .unwrap();
        assert_eq!(config.community.channel_id, "2");
        assert_eq!(config.session.join_link, "https://example.com/join");
        assert!(!config.session.mention_everyone);
    }

    #[test]
    fn test_session_section_defaults() {
        let config = parse(
            r#"
            [discord]
            token = "abc"

            [community]
            guild_id = "1"
            channel_id = "2"
            admin_role_id = "3"
            "#,
        )
        .unwrap();
        assert!(config.session.mention_everyone);
        assert!(config.session.join_link.is_empty());
    }

    #[test]
    fn test_missing_community_is_fatal() {
        let result = parse(
            r#"
            [discord]
            token = "abc"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = parse(
            r#"
            [community]
            guild_id = "1"
            channel_id = "2"
            admin_role_id = "3"
            "#,
        );
        assert!(matches!(result, Err(MusterError::Config(_))));
    }
}
