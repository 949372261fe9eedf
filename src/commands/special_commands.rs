//! Special commands parser for interactive chat
//!
//! Lines typed into `confidant chat` are sent to the companion unless they
//! start with `/`. Slash commands control the session instead:
//! - View backend health and thread state
//! - Reload the conversation from the server
//! - Display help information
//! - Exit the session
//!
//! Commands are case-insensitive.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),
}

/// Special commands that can be executed during interactive chat
///
/// These commands act on the session rather than being sent to the
/// companion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Show backend health, session token and thread size
    ShowStatus,

    /// Re-fetch the conversation from the server
    Reload,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; the line is a message for the companion
    None,
}

/// Parse a line of chat input into a special command
///
/// # Arguments
///
/// * `input` - The line typed by the user
///
/// # Returns
///
/// Returns `SpecialCommand::None` for ordinary messages
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if the line starts with `/` but
/// names no known command
///
/// # Examples
///
/// ```
/// use confidant::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/status").unwrap(), SpecialCommand::ShowStatus);
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/dance").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/reload" | "/refresh" => Ok(SpecialCommand::Reload),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Display help for chat commands
pub fn print_help() {
    println!(
        r#"
Chat Commands
=============

  /status         - Show backend health and session details
  /reload         - Reload the conversation from the server
  /refresh        - Same as /reload
  /help           - Show this help message
  /?              - Same as /help
  /exit           - Leave the conversation
  exit, quit      - Same as /exit

Anything else you type is sent to the companion.
"#
    );
}
