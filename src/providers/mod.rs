//! Provider module for Chatfolio
//!
//! This module contains the completion and embedding gateway abstractions
//! and their OpenAI-compatible implementations.

pub mod base;
pub mod embeddings;
pub mod openai;

pub use base::{ChatCompletion, Choice, ChoiceMessage, Embedder, Provider, TokenUsage};
pub use embeddings::OpenAiEmbedder;
pub use openai::OpenAiProvider;

use crate::config::Config;
use crate::error::Result;
use crate::profile::Credentials;
use std::sync::Arc;

/// Create the completion provider for a profile
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `credentials` - Credentials of the active profile
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built
pub fn create_provider(config: &Config, credentials: &Credentials) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(OpenAiProvider::new(
        config.completion.clone(),
        credentials.clone(),
    )?))
}

/// Create the embedding client for a profile
///
/// Uses the completion `api_base` and the documents `embedding_model`.
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built
pub fn create_embedder(config: &Config, credentials: &Credentials) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(OpenAiEmbedder::new(
        config.completion.api_base.clone(),
        config.documents.embedding_model.clone(),
        config.completion.request_timeout_seconds,
        credentials.clone(),
    )?))
}
