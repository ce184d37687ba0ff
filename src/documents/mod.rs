//! Document handling for Chatfolio
//!
//! - [`library`]: master document set, description map, and the derived
//!   selection that the query router reads
//! - [`index`]: embedding-backed retrieval engines, one per document
//! - [`sub_question`]: question decomposition and answer synthesis over a
//!   set of per-document engines
//! - [`ingest`]: text extraction worker and description generation

pub mod index;
pub mod ingest;
pub mod library;
pub mod sub_question;

pub use index::{DocumentIndex, EmbeddingIndex, RetrievalEngine, VectorRetrievalEngine};
pub use ingest::{IngestEvent, Ingestor, TextExtractor};
pub use library::{derive_selection, Document, DocumentLibrary, Selection};
pub use sub_question::{DocumentTool, SubQuestion, SubQuestionEngine};

use crate::error::{ChatfolioError, Result};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;

/// Master description map file, inside the data directory
pub const DESCRIPTIONS_FILE: &str = "descriptions.json";
/// Filtered description map file, inside the selection directory
pub const SELECTED_DESCRIPTIONS_FILE: &str = "selected_descriptions.json";

/// Document base name to short description
pub type DescriptionMap = BTreeMap<String, String>;

/// Load a description map
///
/// A missing or corrupt file yields an empty map; corruption is logged.
pub fn load_descriptions(path: &Path) -> DescriptionMap {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return DescriptionMap::new(),
        Err(e) => {
            tracing::warn!("Error reading description map {}: {}", path.display(), e);
            return DescriptionMap::new();
        }
    };

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        tracing::warn!("Invalid description map {}: {}", path.display(), e);
        DescriptionMap::new()
    })
}

/// Write a description map as 4-space indented JSON
pub fn save_descriptions(path: &Path, descriptions: &DescriptionMap) -> Result<()> {
    use serde::Serialize;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    descriptions
        .serialize(&mut serializer)
        .map_err(|e| ChatfolioError::Storage(format!("Failed to serialize descriptions: {}", e)))?;

    std::fs::write(path, buf).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Whether a selection directory holds at least one document
///
/// Only regular files count, and `.json` files are metadata.
pub fn documents_available(selected_dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(selected_dir) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let path = entry.path();
        path.is_file() && !is_metadata(&path)
    })
}

pub(crate) fn is_metadata(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Base name of a document file (file name without extension)
pub(crate) fn document_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}
