//! Command-line interface definition for Chatfolio
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chatting, profile management, session history,
//! and document management.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chatfolio - profile-based LLM chat client
///
/// Converse with a language model, keep per-profile session history,
/// and answer questions from your own uploaded documents.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatfolio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the profiles root directory
    #[arg(long, env = "CHATFOLIO_PROFILES_DIR")]
    pub profiles_dir: Option<PathBuf>,

    /// Override the chat model
    #[arg(long)]
    pub model: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Chatfolio
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Profile to chat as
        #[arg(short, long)]
        profile: String,

        /// Resume a specific session instead of the most recent one
        #[arg(short, long)]
        session: Option<String>,

        /// Start a fresh session even if history exists
        #[arg(short, long, conflicts_with = "session")]
        new: bool,
    },

    /// Manage profiles
    Profile {
        /// Profile subcommand
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Browse and manage chat sessions
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Upload and select documents for retrieval
    Docs {
        /// Document subcommand
        #[command(subcommand)]
        command: DocsCommand,
    },
}

/// Profile management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Create a new profile with an API key
    Create {
        /// Profile name
        name: String,

        /// API key for the completion service (prompted for when omitted)
        #[arg(long, env = "CHATFOLIO_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// List existing profiles
    List,

    /// Show where a profile keeps its data
    Show {
        /// Profile name
        name: String,
    },
}

/// Session history subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List sessions, most recent first
    List {
        /// Profile name
        #[arg(short, long)]
        profile: String,
    },

    /// Print the transcript of a session
    Show {
        /// Profile name
        #[arg(short, long)]
        profile: String,

        /// Session name
        session: String,
    },

    /// Rename a session
    Rename {
        /// Profile name
        #[arg(short, long)]
        profile: String,

        /// Current session name
        from: String,

        /// New session name
        to: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete a session
    Delete {
        /// Profile name
        #[arg(short, long)]
        profile: String,

        /// Session name
        session: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Document management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum DocsCommand {
    /// Extract text from a file and add it to the profile's library
    Upload {
        /// Profile name
        #[arg(short, long)]
        profile: String,

        /// File to ingest (PDF or plain text)
        file: PathBuf,

        /// Skip generating a description for the document
        #[arg(long)]
        no_describe: bool,
    },

    /// List documents and their descriptions
    List {
        /// Profile name
        #[arg(short, long)]
        profile: String,
    },

    /// Choose which documents answer questions (empty clears the selection)
    Select {
        /// Profile name
        #[arg(short, long)]
        profile: String,

        /// Document names (with or without extension)
        names: Vec<String>,
    },

    /// Set a document's description by hand
    Describe {
        /// Profile name
        #[arg(short, long)]
        profile: String,

        /// Document name (with or without extension)
        name: String,

        /// Description text
        description: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
