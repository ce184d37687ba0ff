//! OpenAI-compatible embeddings client
//!
//! Posts `{model, input: [...]}` to `{api_base}/embeddings` and returns the
//! vectors reordered by their `index` field.

use crate::error::{ChatfolioError, Result};
use crate::profile::Credentials;
use crate::providers::openai::{build_client, endpoint};
use crate::providers::Embedder;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Inputs sent per embeddings request
const BATCH_SIZE: usize = 64;

/// Embedding client for OpenAI-compatible services
pub struct OpenAiEmbedder {
    client: Client,
    api_base: String,
    model: String,
    credentials: Credentials,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new embedding client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        timeout_seconds: u64,
        credentials: Credentials,
    ) -> Result<Self> {
        let api_base = api_base.into();
        let model = model.into();
        tracing::debug!("Initialized embedder: api_base={}, model={}", api_base, model);

        Ok(Self {
            client: build_client(timeout_seconds)?,
            api_base,
            model,
            credentials,
        })
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = endpoint(&self.api_base, "embeddings");
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.credentials.api_key())
            .json(&EmbeddingRequest {
                model: &self.model,
                input: batch,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Embedding request failed: {}", e);
                ChatfolioError::Retrieval(format!("Embedding request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Embedding service returned {}: {}", status, error_text);
            return Err(ChatfolioError::Retrieval(format!(
                "Embedding service returned {}: {}",
                status, error_text
            ))
            .into());
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            ChatfolioError::Retrieval(format!("Failed to parse embedding response: {}", e))
        })?;

        if parsed.data.len() != batch.len() {
            return Err(ChatfolioError::Retrieval(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                parsed.data.len()
            ))
            .into());
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}
