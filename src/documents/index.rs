//! Embedding-backed document retrieval
//!
//! A document is split into overlapping character windows, each window is
//! embedded once, and queries are answered from the `top_k` most similar
//! windows by the completion provider.

use crate::config::DocumentsConfig;
use crate::error::{ChatfolioError, Result};
use crate::providers::{Embedder, Provider};
use crate::session::Turn;

use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Answers natural-language questions about one document
#[async_trait]
pub trait RetrievalEngine: Send + Sync {
    /// Answer a question from the indexed text
    async fn query(&self, text: &str) -> Result<String>;
}

/// Builds retrieval engines over document files
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Index one document
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, has no text, or cannot be
    /// embedded
    async fn index(&self, path: &Path) -> Result<Arc<dyn RetrievalEngine>>;
}

/// Split text into overlapping windows of `size` characters
///
/// Consecutive windows share `overlap` characters. Whitespace-only windows
/// are dropped.
///
/// # Examples
///
/// ```
/// use chatfolio::documents::index::chunk_text;
///
/// let chunks = chunk_text("abcdefghij", 4, 1);
/// assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
/// ```
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || size == 0 {
        return Vec::new();
    }

    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Cosine similarity of two vectors, 0.0 when undefined
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// In-memory vector index over one document's chunks
pub struct VectorRetrievalEngine {
    chunks: Vec<(String, Vec<f32>)>,
    embedder: Arc<dyn Embedder>,
    provider: Arc<dyn Provider>,
    top_k: usize,
}

impl VectorRetrievalEngine {
    /// Create an engine from pre-embedded chunks
    pub fn new(
        chunks: Vec<(String, Vec<f32>)>,
        embedder: Arc<dyn Embedder>,
        provider: Arc<dyn Provider>,
        top_k: usize,
    ) -> Self {
        Self {
            chunks,
            embedder,
            provider,
            top_k,
        }
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the engine holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `top_k` chunks most similar to `query_vector`, best first
    pub fn nearest(&self, query_vector: &[f32]) -> Vec<&str> {
        let mut scored: Vec<(f32, &str)> = self
            .chunks
            .iter()
            .map(|(text, vector)| (cosine_similarity(query_vector, vector), text.as_str()))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, text)| text)
            .collect()
    }
}

fn answer_prompt(context: &[&str], question: &str) -> Vec<Turn> {
    vec![
        Turn::system(
            "Answer the question using only the document excerpts provided. \
             If the excerpts do not contain the answer, say so.",
        ),
        Turn::user(format!(
            "Document excerpts:\n---\n{}\n---\n\nQuestion: {}",
            context.join("\n---\n"),
            question
        )),
    ]
}

#[async_trait]
impl RetrievalEngine for VectorRetrievalEngine {
    async fn query(&self, text: &str) -> Result<String> {
        let query_vector = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatfolioError::Retrieval("No embedding for query".to_string()))?;

        let context = self.nearest(&query_vector);
        tracing::debug!("Answering from {} chunk(s)", context.len());

        self.provider
            .complete_text(&answer_prompt(&context, text))
            .await
    }
}

/// Builds [`VectorRetrievalEngine`]s through an embedding gateway
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    provider: Arc<dyn Provider>,
    chunk_size: usize,
    chunk_overlap: usize,
    top_k: usize,
}

impl EmbeddingIndex {
    /// Create an index builder with the configured chunking and ranking
    pub fn new(
        embedder: Arc<dyn Embedder>,
        provider: Arc<dyn Provider>,
        config: &DocumentsConfig,
    ) -> Self {
        Self {
            embedder,
            provider,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            top_k: config.similarity_top_k,
        }
    }

    /// Index text that is already in memory
    pub async fn index_text(&self, text: &str) -> Result<VectorRetrievalEngine> {
        let chunks = chunk_text(text, self.chunk_size, self.chunk_overlap);
        if chunks.is_empty() {
            return Err(ChatfolioError::Ingestion("Document has no text".to_string()).into());
        }

        let vectors = self.embedder.embed(&chunks).await?;
        Ok(VectorRetrievalEngine::new(
            chunks.into_iter().zip(vectors).collect(),
            self.embedder.clone(),
            self.provider.clone(),
            self.top_k,
        ))
    }
}

#[async_trait]
impl DocumentIndex for EmbeddingIndex {
    async fn index(&self, path: &Path) -> Result<Arc<dyn RetrievalEngine>> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;

        let engine = self.index_text(&text).await?;
        tracing::debug!("Indexed {} into {} chunk(s)", path.display(), engine.len());
        Ok(Arc::new(engine))
    }
}
