//! Error types for Chatfolio
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatfolio operations
///
/// Covers configuration problems, profile and credential lookups,
/// session storage, gateway calls, and document ingestion. Gateway
/// failures never escape the query router; they are listed here so the
/// gateways themselves can report precise causes.
#[derive(Error, Debug)]
pub enum ChatfolioError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile name is empty or would escape the profiles root
    #[error("Invalid profile name: {0}")]
    InvalidProfileName(String),

    /// Profile directory does not exist
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile already exists and cannot be created again
    #[error("Profile already exists: {0}")]
    ProfileExists(String),

    /// Credential record missing or lacks a usable API key
    #[error("Missing credentials for profile: {0}")]
    MissingCredentials(String),

    /// Completion or embedding gateway errors (HTTP status, malformed body)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Document index or retrieval errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Document is not part of the profile's library
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Document text extraction or ingestion errors
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Session name is empty or contains a path separator
    #[error("Invalid session name: {0}")]
    InvalidSessionName(String),

    /// Session file does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Rename target already exists
    #[error("Session name collision: {0} already exists")]
    NameCollision(String),

    /// A user turn is still being answered
    #[error("A message is already being processed; wait for the reply before sending another")]
    TurnInProgress,

    /// Session or description storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Chatfolio operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
