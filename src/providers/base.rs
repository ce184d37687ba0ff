//! Base provider traits and the completion response types
//!
//! The completion gateway returns the raw response shape of an
//! OpenAI-compatible `/chat/completions` call. Callers decide how to treat
//! a response with no choices or no message content.

use crate::error::{ChatfolioError, Result};
use crate::session::Turn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token accounting reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    #[serde(default)]
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    #[serde(default)]
    pub total_tokens: usize,
}

/// Message inside a completion choice
///
/// Both fields are optional because compatible services disagree on what
/// they omit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    /// Role of the message, normally `assistant`
    #[serde(default)]
    pub role: Option<String>,
    /// Generated text
    #[serde(default)]
    pub content: Option<String>,
}

/// One candidate reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Position of this choice in the response
    #[serde(default)]
    pub index: usize,
    /// The candidate message, absent on malformed responses
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Response of a chat completion request
///
/// # Examples
///
/// ```
/// use chatfolio::providers::ChatCompletion;
///
/// let completion: ChatCompletion = serde_json::from_str(
///     r#"{"choices":[{"message":{"role":"assistant","content":" Hi "}}]}"#,
/// ).unwrap();
/// assert_eq!(completion.first_content(), Some(" Hi "));
///
/// let empty: ChatCompletion = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
/// assert_eq!(empty.first_content(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Candidate replies, in service order
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Optional token usage information
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ChatCompletion {
    /// Build a response holding a single assistant choice
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message: Some(ChoiceMessage {
                    role: Some("assistant".to_string()),
                    content: Some(content.into()),
                }),
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        }
    }

    /// Content of the first choice's message, untrimmed
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
    }
}

/// Completion gateway
///
/// Implementations send an ordered list of turns and return the service's
/// response unchanged.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation
    ///
    /// # Arguments
    ///
    /// * `messages` - Conversation in order, oldest first
    ///
    /// # Returns
    ///
    /// Returns the raw completion response
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the service returns a non-success
    /// status, or the body cannot be decoded
    async fn complete(&self, messages: &[Turn]) -> Result<ChatCompletion>;

    /// Model this provider sends requests to
    fn model(&self) -> &str;

    /// Completes a conversation and returns the trimmed reply text
    ///
    /// # Errors
    ///
    /// Returns `ChatfolioError::Provider` when the response carries no
    /// message content, in addition to the errors of [`Provider::complete`]
    async fn complete_text(&self, messages: &[Turn]) -> Result<String> {
        let completion = self.complete(messages).await?;
        completion
            .first_content()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                ChatfolioError::Provider("Completion contained no message content".to_string())
                    .into()
            })
    }
}

/// Embedding gateway
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each input text, returning vectors in input order
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the service returns a different
    /// number of vectors than inputs
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}
