//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session without sending messages to the
//! backend.

use crate::strategy::Mode;

/// A parsed chat command.
///
/// These commands control the chat client and are not sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Clear the transcript.  The session is kept.
    Clear,

    /// Reload the transcript from the backend's stored history, for the
    /// current session or the one named.
    History(Option<String>),

    /// List the sessions the backend knows about.
    Sessions,

    /// Show the current session.
    Session,

    /// Start over in a new session.
    New,

    /// Switch the request mode.
    Mode(Mode),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use chatstream::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/mode single-shot").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History(argument.map(|s| s.to_string())),
        "sessions" => ChatCommand::Sessions,
        "session" => ChatCommand::Session,
        "new" => ChatCommand::New,
        "mode" => match argument {
            Some(arg) => match arg.parse::<Mode>() {
                Ok(mode) => ChatCommand::Mode(mode),
                Err(_) => ChatCommand::Invalid(format!(
                    "/mode expects one of: {}",
                    Mode::ALL.map(Mode::as_str).join(", ")
                )),
            },
            None => ChatCommand::Invalid("/mode requires a mode name".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear the transcript (the session is kept)
  /history [session]     Reload stored history for this or another session
  /sessions              List sessions stored by the backend
  /session               Show the current session
  /new                   Start a new session
  /mode <mode>           Switch mode: stream-session, stream-per-message, single-shot
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat

Press Ctrl-C while a reply is streaming to stop it."#
}
