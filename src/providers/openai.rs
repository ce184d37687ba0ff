//! OpenAI-compatible chat completion provider
//!
//! Posts `{model, messages, max_tokens, temperature}` to
//! `{api_base}/chat/completions` with bearer authentication.

use crate::config::CompletionConfig;
use crate::error::{ChatfolioError, Result};
use crate::profile::Credentials;
use crate::providers::{ChatCompletion, Provider};
use crate::session::Turn;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Chat completion provider for OpenAI-compatible services
///
/// # Examples
///
/// ```no_run
/// use chatfolio::config::CompletionConfig;
/// use chatfolio::profile::Credentials;
/// use chatfolio::providers::{OpenAiProvider, Provider};
/// use chatfolio::session::Turn;
///
/// # async fn example() -> chatfolio::error::Result<()> {
/// let provider = OpenAiProvider::new(CompletionConfig::default(), Credentials::new("sk-..."))?;
/// let completion = provider.complete(&[Turn::user("Hello!")]).await?;
/// println!("{:?}", completion.first_content());
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: CompletionConfig,
    credentials: Credentials,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    max_tokens: u32,
    temperature: f32,
}

/// Build the HTTP client shared by the gateway clients
pub(crate) fn build_client(timeout_seconds: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("chatfolio/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ChatfolioError::Provider(format!("Failed to create HTTP client: {}", e)).into())
}

/// Join an API base and an endpoint path without doubling the slash
pub(crate) fn endpoint(api_base: &str, path: &str) -> String {
    format!("{}/{}", api_base.trim_end_matches('/'), path)
}

impl OpenAiProvider {
    /// Create a new provider
    ///
    /// # Arguments
    ///
    /// * `config` - Completion settings
    /// * `credentials` - API key of the active profile
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: CompletionConfig, credentials: Credentials) -> Result<Self> {
        let client = build_client(config.request_timeout_seconds)?;

        tracing::info!(
            "Initialized completion provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    /// Base URL requests are sent to
    pub fn api_base(&self) -> &str {
        &self.config.api_base
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, messages: &[Turn]) -> Result<ChatCompletion> {
        let url = endpoint(&self.config.api_base, "chat/completions");
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        tracing::debug!("Sending completion request: {} messages", messages.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.credentials.api_key())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Completion request failed: {}", e);
                ChatfolioError::Provider(format!("Completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Completion service returned {}: {}", status, error_text);
            return Err(ChatfolioError::Provider(format!(
                "Completion service returned {}: {}",
                status, error_text
            ))
            .into());
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse completion response: {}", e);
            ChatfolioError::Provider(format!("Failed to parse completion response: {}", e))
        })?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                "Completion usage: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        Ok(completion)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
