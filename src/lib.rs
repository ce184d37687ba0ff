//! Chatfolio - profile-based LLM chat client library
//!
//! This library provides the core functionality for Chatfolio: per-profile
//! credentials, durable chat sessions, document ingestion and selection,
//! and a query router that answers either from the conversation model or
//! from the selected documents.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `profile`: Profile directories and credential records
//! - `session`: Append-only session logs and listings
//! - `documents`: Ingestion, descriptions, selection, and retrieval
//! - `providers`: OpenAI-compatible completion and embedding gateways
//! - `router`: Chooses between document retrieval and plain completion
//! - `controller`: Sequences one user turn at a time
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` and `commands`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use chatfolio::{Config, ProfileStore, QueryRouter, SessionController, SessionLog};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let profile = ProfileStore::new(&config.profiles_dir).open("alice")?;
//!     let router = Arc::new(QueryRouter::for_profile(&config, &profile)?);
//!     let (controller, _events) = SessionController::new(SessionLog::open(&profile)?, router);
//!     controller.submit("Hello!").await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod documents;
pub mod error;
pub mod profile;
pub mod providers;
pub mod router;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use controller::{SessionController, SubmitOutcome, TurnEvent, TurnState};
pub use error::{ChatfolioError, Result};
pub use profile::{Profile, ProfileStore};
pub use router::{QueryRouter, FALLBACK_REPLY};
pub use session::{Role, SessionLog, Turn};

#[cfg(test)]
pub mod test_utils;
