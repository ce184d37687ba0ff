use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model; used for internal prompts, never persisted
    System,
    /// The human side of the conversation
    User,
    /// The model's reply
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation
///
/// Serializes as `{"role": "...", "content": "..."}`, which is both the
/// session file format and the chat completion message format.
///
/// # Examples
///
/// ```
/// use chatfolio::session::{Role, Turn};
///
/// let turn = Turn::user("hello");
/// assert_eq!(turn.role, Role::User);
/// assert_eq!(
///     serde_json::to_string(&turn).unwrap(),
///     r#"{"role":"user","content":"hello"}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced the message
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Turn {
    /// Creates a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Creates a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Ordered sequence of turns, in conversational order
pub type Transcript = Vec<Turn>;

/// Metadata for a stored session file
#[derive(Debug, Clone)]
pub struct SessionDescriptor {
    /// Session name (file stem)
    pub name: String,
    /// Full path of the session file
    pub path: PathBuf,
    /// Last modification time
    pub modified: DateTime<Local>,
    /// Number of turns in the transcript
    pub turn_count: usize,
}
