//! Document ingestion
//!
//! Text extraction runs on a blocking worker and reports progress over a
//! channel: one `Progress` event per page, then exactly one `Finished` or
//! `Failed`. Describing a document afterwards goes through the retrieval
//! engine and merges the result into the master description map.

use super::index::DocumentIndex;
use super::library::DocumentLibrary;
use super::document_name;
use crate::error::{ChatfolioError, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Page separator in extracted PDF text
const PAGE_BREAK: char = '\x0c';

/// Events reported by an ingestion worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// Percentage of pages processed, 0 to 100
    Progress(u8),
    /// Extraction succeeded and the text was written to `path`
    Finished {
        /// Path of the extracted text
        path: PathBuf,
    },
    /// Extraction failed
    Failed {
        /// Human-readable cause
        error: String,
    },
}

/// Turns a source file into pages of plain text
pub trait TextExtractor: Send + Sync {
    /// Extract the text of every page, in order
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// Extracts the text layer of PDFs and reads anything else as UTF-8 text
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExtractor;

impl TextExtractor for DefaultExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            let text = pdf_extract::extract_text(path).map_err(|e| {
                ChatfolioError::Ingestion(format!("Cannot read PDF {}: {}", path.display(), e))
            })?;
            Ok(split_pages(&text))
        } else {
            let text = std::fs::read_to_string(path).map_err(|e| {
                ChatfolioError::Ingestion(format!("Cannot read {}: {}", path.display(), e))
            })?;
            Ok(vec![text])
        }
    }
}

/// Split extracted PDF text on form feeds, dropping a trailing empty page
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(|p| p.to_string()).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Runs ingestion for one profile's library
#[derive(Clone)]
pub struct Ingestor {
    library: DocumentLibrary,
    extractor: Arc<dyn TextExtractor>,
}

impl Ingestor {
    /// Ingestor using the default extractor
    pub fn new(library: DocumentLibrary) -> Self {
        Self::with_extractor(library, Arc::new(DefaultExtractor))
    }

    /// Ingestor using a specific extractor
    pub fn with_extractor(library: DocumentLibrary, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { library, extractor }
    }

    /// Start extracting `source` into the library
    ///
    /// Returns the receiving end of the worker's event channel. The worker
    /// writes `<data_dir>/<base name>.txt`, replacing an earlier upload of
    /// the same name.
    pub fn spawn(&self, source: PathBuf) -> mpsc::Receiver<IngestEvent> {
        let (tx, rx) = mpsc::channel(32);
        let library = self.library.clone();
        let extractor = self.extractor.clone();

        tokio::task::spawn_blocking(move || {
            let event = match extract_into(&library, extractor.as_ref(), &source, &tx) {
                Ok(path) => {
                    tracing::info!("Ingested {} into {}", source.display(), path.display());
                    IngestEvent::Finished { path }
                }
                Err(e) => {
                    tracing::error!("Ingestion of {} failed: {}", source.display(), e);
                    IngestEvent::Failed {
                        error: e.to_string(),
                    }
                }
            };
            let _ = tx.blocking_send(event);
        });

        rx
    }

    /// Generate and store a description of an ingested document
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be indexed or queried, or the
    /// description map cannot be written
    pub async fn describe(
        &self,
        text_path: &Path,
        index: &dyn DocumentIndex,
        prompt: &str,
    ) -> Result<String> {
        let name = document_name(text_path).ok_or_else(|| {
            ChatfolioError::Ingestion(format!("Unusable file name: {}", text_path.display()))
        })?;

        let engine = index.index(text_path).await?;
        let description = engine.query(prompt).await?;
        self.library.set_description(&name, &description)?;
        Ok(description.trim().to_string())
    }
}

fn extract_into(
    library: &DocumentLibrary,
    extractor: &dyn TextExtractor,
    source: &Path,
    tx: &mpsc::Sender<IngestEvent>,
) -> Result<PathBuf> {
    if !source.is_file() {
        return Err(ChatfolioError::Ingestion(format!("No such file: {}", source.display())).into());
    }
    let destination = library.text_path_for(source)?;

    let pages = extractor.extract_pages(source)?;
    let total = pages.len();
    let mut content = String::new();

    if total == 0 {
        let _ = tx.blocking_send(IngestEvent::Progress(100));
    }
    for (i, page) in pages.iter().enumerate() {
        content.push_str(page);
        let percent = ((i + 1) * 100 / total) as u8;
        let _ = tx.blocking_send(IngestEvent::Progress(percent));
    }

    if content.trim().is_empty() {
        return Err(ChatfolioError::Ingestion(format!(
            "No text could be extracted from {}",
            source.display()
        ))
        .into());
    }

    std::fs::create_dir_all(library.data_dir())?;
    std::fs::write(&destination, content)?;
    Ok(destination)
}
