//! Query routing
//!
//! Every user message is answered either from the profile's selected
//! documents or by the completion provider with the whole transcript as
//! context. Which path runs depends only on whether the selection directory
//! holds a document.
//!
//! [`QueryRouter::route`] never fails. A missing completion yields
//! [`FALLBACK_REPLY`], and gateway errors come back as
//! `"Error processing the response: {cause}"`.

use crate::config::Config;
use crate::documents::{
    documents_available, DocumentIndex, DocumentLibrary, DocumentTool, EmbeddingIndex, Selection,
    SubQuestionEngine,
};
use crate::error::{ChatfolioError, Result};
use crate::profile::Profile;
use crate::providers::{create_embedder, create_provider, Provider};
use crate::session::Turn;

use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Reply used when no usable answer was produced
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process that request.";

struct CachedEngine {
    fingerprint: String,
    engine: Arc<SubQuestionEngine>,
}

/// Chooses between document retrieval and plain completion
pub struct QueryRouter {
    provider: Arc<dyn Provider>,
    index: Arc<dyn DocumentIndex>,
    library: DocumentLibrary,
    max_sub_questions: usize,
    timeout: Duration,
    cache: Arc<Mutex<Option<CachedEngine>>>,
}

impl QueryRouter {
    /// Create a router over explicit gateways
    pub fn new(
        provider: Arc<dyn Provider>,
        index: Arc<dyn DocumentIndex>,
        library: DocumentLibrary,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            index,
            library,
            max_sub_questions: config.documents.max_sub_questions,
            timeout: Duration::from_secs(config.completion.request_timeout_seconds),
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a router for a profile with the OpenAI-compatible gateways
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` if the profile has no usable API key
    pub fn for_profile(config: &Config, profile: &Profile) -> Result<Self> {
        let credentials = profile.load_credentials()?;
        let provider = create_provider(config, &credentials)?;
        let embedder = create_embedder(config, &credentials)?;
        let index = Arc::new(EmbeddingIndex::new(
            embedder,
            provider.clone(),
            &config.documents,
        ));

        Ok(Self::new(
            provider,
            index,
            DocumentLibrary::new(profile),
            config,
        ))
    }

    /// Override the per-path time limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the next message would take the document path
    pub fn documents_available(&self) -> bool {
        documents_available(self.library.selected_dir())
    }

    /// Produce the assistant reply for `query`
    ///
    /// `transcript` must already end with the user turn for `query`; it is
    /// the context of the completion path.
    pub async fn route(&self, query: &str, transcript: &[Turn]) -> String {
        let outcome = if self.documents_available() {
            tracing::debug!("Routing to selected documents");
            self.within_timeout(self.answer_from_documents(query)).await
        } else {
            tracing::debug!("Routing to completion with {} turn(s)", transcript.len());
            self.within_timeout(self.answer_from_completion(transcript)).await
        };

        match outcome {
            Ok(Some(reply)) if !reply.is_empty() => reply,
            Ok(_) => {
                tracing::warn!("No usable reply, answering with fallback");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => match gateway_cause(&e) {
                Some(cause) => {
                    tracing::error!("Gateway failure: {}", cause);
                    format!("Error processing the response: {}", cause)
                }
                None => {
                    tracing::warn!("Document path failed: {:#}", e);
                    FALLBACK_REPLY.to_string()
                }
            },
        }
    }

    async fn within_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ChatfolioError::Provider(format!(
                "request timed out after {:?}",
                self.timeout
            ))
            .into()),
        }
    }

    async fn answer_from_completion(&self, transcript: &[Turn]) -> Result<Option<String>> {
        let completion = self.provider.complete(transcript).await?;
        Ok(completion
            .first_content()
            .map(|content| content.trim().to_string()))
    }

    async fn answer_from_documents(&self, query: &str) -> Result<Option<String>> {
        let Some(engine) = self.engine().await? else {
            return Ok(None);
        };
        let answer = engine.query(query).await?;
        Ok(Some(answer.trim().to_string()))
    }

    /// Sub-question engine for the current selection, rebuilt when the
    /// selection fingerprint changes
    ///
    /// The build runs on its own task and holds the cache lock until it
    /// stores its result, so a caller that times out still leaves the
    /// engines cached for the next query.
    async fn engine(&self) -> Result<Option<Arc<SubQuestionEngine>>> {
        let selection = self.library.load_selection()?;
        let fingerprint = selection_fingerprint(&selection)?;

        let build = tokio::spawn(build_engine(
            self.cache.clone(),
            self.index.clone(),
            self.provider.clone(),
            selection,
            fingerprint,
            self.max_sub_questions,
        ));
        build
            .await
            .map_err(|e| anyhow::anyhow!("Document index task failed: {}", e))?
    }
}

async fn build_engine(
    cache: Arc<Mutex<Option<CachedEngine>>>,
    index: Arc<dyn DocumentIndex>,
    provider: Arc<dyn Provider>,
    selection: Selection,
    fingerprint: String,
    max_sub_questions: usize,
) -> Result<Option<Arc<SubQuestionEngine>>> {
    let mut cache = cache.lock().await;
    if let Some(cached) = cache.as_ref() {
        if cached.fingerprint == fingerprint {
            tracing::debug!("Reusing document engines");
            return Ok(Some(cached.engine.clone()));
        }
    }

    let mut tools = Vec::new();
    for doc in &selection.documents {
        let Some(description) = selection.descriptions.get(&doc.name) else {
            tracing::warn!("Skipping {}: no description", doc.name);
            continue;
        };
        match index.index(&doc.path).await {
            Ok(engine) => tools.push(DocumentTool {
                name: doc.name.clone(),
                description: description.clone(),
                engine,
            }),
            Err(e) if gateway_cause(&e).is_some() => return Err(e),
            Err(e) => tracing::warn!("Skipping {}: {:#}", doc.name, e),
        }
    }

    if tools.is_empty() {
        tracing::warn!("No indexable documents in selection");
        *cache = None;
        return Ok(None);
    }

    tracing::info!("Indexed {} selected document(s)", tools.len());
    let engine = Arc::new(SubQuestionEngine::new(provider, tools, max_sub_questions));
    *cache = Some(CachedEngine {
        fingerprint,
        engine: engine.clone(),
    });
    Ok(Some(engine))
}

/// Cause of a gateway failure, or `None` for local failures
fn gateway_cause(e: &anyhow::Error) -> Option<String> {
    match e.downcast_ref::<ChatfolioError>()? {
        ChatfolioError::Provider(msg) | ChatfolioError::Retrieval(msg) => Some(msg.clone()),
        ChatfolioError::Http(err) => Some(err.to_string()),
        _ => None,
    }
}

/// SHA-256 over the selected files' names, sizes, and modification times,
/// plus the selected description map
pub fn selection_fingerprint(selection: &Selection) -> Result<String> {
    let mut hasher = Sha256::new();
    for doc in &selection.documents {
        let metadata = std::fs::metadata(&doc.path)?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();

        hasher.update(doc.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(metadata.len().to_le_bytes());
        hasher.update(modified.as_nanos().to_le_bytes());
    }
    hasher.update(serde_json::to_vec(&selection.descriptions)?);
    Ok(format!("{:x}", hasher.finalize()))
}
