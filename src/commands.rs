//! Operator command parsing for the primary channel.

use muster_core::types::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `!announce <@host> <time>` — announce a session.
    Announce { host: UserId, time: String },
    /// `!startsession` — start the session and send reminders.
    Start,
    /// `!test` — post a self-deleting preview of the announcement format.
    Test,
    /// `!reset` — drop the current session.
    Reset,
}

/// Parse a channel message into a command. Non-command chatter is `None`;
/// a recognized command with missing arguments is reported as malformed so
/// the invoker gets a usage notice instead of silence.
pub fn parse_command(content: &str) -> Option<std::result::Result<Command, &'static str>> {
    let mut parts = content.split_whitespace();
    match parts.next()? {
        "!announce" => {
            let Some(host) = parts.next().and_then(parse_mention) else {
                return Some(Err("Usage: !announce <@host> <time>"));
            };
            let Some(time) = parts.next() else {
                return Some(Err("Usage: !announce <@host> <time>"));
            };
            Some(Ok(Command::Announce {
                host,
                time: time.to_string(),
            }))
        }
        "!startsession" => Some(Ok(Command::Start)),
        "!test" => Some(Ok(Command::Test)),
        "!reset" => Some(Ok(Command::Reset)),
        _ => None,
    }
}

/// Accepts `<@123>`, `<@!123>`, or a raw numeric id.
fn parse_mention(token: &str) -> Option<UserId> {
    let inner = token
        .strip_prefix("<@")
        .map(|rest| rest.strip_prefix('!').unwrap_or(rest))
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(token);
    if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
        Some(UserId::new(inner))
    } else {
        None
    }
}
