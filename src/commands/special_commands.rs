//! Special commands parser for interactive chat
//!
//! Special commands manage the conversation instead of being sent to the
//! model:
//! - Start a new session or resume an earlier one
//! - List sessions and show the current transcript
//! - View session and document status
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/` and are case-insensitive. Arguments keep
//! their case.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },

    /// Command takes no argument but one was given
    #[error("Command {command} takes no argument, got: {arg}")]
    UnexpectedArgument { command: String, arg: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new session; the next message creates its file
    NewSession,

    /// List this profile's sessions
    ListSessions,

    /// Resume the named session
    LoadSession(String),

    /// Print the current transcript
    ShowHistory,

    /// Show profile, session, and document status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input is sent as a chat message.
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is
/// not a valid command, `MissingArgument` for `/load` without a name, and
/// `UnexpectedArgument` when an argument is given to a command without
/// parameters.
///
/// # Examples
///
/// ```
/// use chatfolio::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::NewSession);
/// assert_eq!(
///     parse_special_command("/LOAD alice_Session_2024-01-01_09-00-00").unwrap(),
///     SpecialCommand::LoadSession("alice_Session_2024-01-01_09-00-00".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if lower == "exit" || lower == "quit" {
        return Ok(SpecialCommand::Exit);
    }
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (command, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((command, arg)) => (command.to_lowercase(), arg.trim()),
        None => (lower.clone(), ""),
    };

    let no_arg = |cmd: SpecialCommand| {
        if arg.is_empty() {
            Ok(cmd)
        } else {
            Err(CommandError::UnexpectedArgument {
                command: command.clone(),
                arg: arg.to_string(),
            })
        }
    };

    match command.as_str() {
        "/new" => no_arg(SpecialCommand::NewSession),
        "/sessions" => no_arg(SpecialCommand::ListSessions),
        "/history" => no_arg(SpecialCommand::ShowHistory),
        "/status" => no_arg(SpecialCommand::ShowStatus),
        "/help" | "/?" => no_arg(SpecialCommand::Help),
        "/exit" | "/quit" => no_arg(SpecialCommand::Exit),
        "/load" | "/resume" => {
            if arg.is_empty() {
                Err(CommandError::MissingArgument {
                    command: command.clone(),
                    usage: "/load <session name>".to_string(),
                })
            } else {
                Ok(SpecialCommand::LoadSession(arg.to_string()))
            }
        }
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help for the special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSIONS:
  /new            - Start a new session
  /sessions       - List sessions, most recent first
  /load <name>    - Resume a session by name
  /resume <name>  - Same as /load
  /history        - Show the current transcript

SESSION INFORMATION:
  /status         - Show profile, session, and document status
  /help           - Show this help message
  /?              - Same as /help

SESSION CONTROL:
  exit            - Exit interactive mode
  quit            - Same as exit

NOTES:
  - Commands are case-insensitive; session names are not
  - Regular text (not starting with /) is sent as a message
  - When documents are selected (see `chatfolio docs select`), questions
    are answered from those documents
"#
    );
}
