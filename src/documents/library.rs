//! Document library
//!
//! Extracted document bodies live as `<name>.txt` files in the profile's
//! data directory, next to the master description map. The selection the
//! router reads is derived from those two inputs by [`derive_selection`]
//! and materialized into `selected_files/`. The materialized copy is a
//! cache and can be rebuilt from the master set at any time.

use super::{
    document_name, load_descriptions, save_descriptions, DescriptionMap, DESCRIPTIONS_FILE,
    SELECTED_DESCRIPTIONS_FILE,
};
use crate::error::{ChatfolioError, Result};
use crate::profile::Profile;
use anyhow::Context;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const DOCUMENT_EXTENSION: &str = "txt";

/// An extracted document in the master set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Base name, the key into the description map
    pub name: String,
    /// Path of the extracted text
    pub path: PathBuf,
}

/// The derived subset of documents the router answers from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected documents, in name order
    pub documents: Vec<Document>,
    /// Descriptions of the selected documents only
    pub descriptions: DescriptionMap,
}

/// Compute the selected subset
///
/// Keeps every master document whose name is in `selected`, and the
/// descriptions of exactly those documents. Names in `selected` that match
/// no document are ignored.
///
/// # Examples
///
/// ```
/// use chatfolio::documents::{derive_selection, Document};
/// use std::collections::{BTreeMap, BTreeSet};
///
/// let docs = vec![
///     Document { name: "a".into(), path: "a.txt".into() },
///     Document { name: "b".into(), path: "b.txt".into() },
/// ];
/// let descriptions = BTreeMap::from([
///     ("a".to_string(), "first".to_string()),
///     ("b".to_string(), "second".to_string()),
/// ]);
/// let selected = BTreeSet::from(["b".to_string()]);
///
/// let selection = derive_selection(&docs, &descriptions, &selected);
/// assert_eq!(selection.documents.len(), 1);
/// assert_eq!(selection.descriptions.get("b").unwrap(), "second");
/// assert!(!selection.descriptions.contains_key("a"));
/// ```
pub fn derive_selection(
    documents: &[Document],
    descriptions: &DescriptionMap,
    selected: &BTreeSet<String>,
) -> Selection {
    let mut chosen: Vec<Document> = documents
        .iter()
        .filter(|doc| selected.contains(&doc.name))
        .cloned()
        .collect();
    chosen.sort_by(|a, b| a.name.cmp(&b.name));

    let descriptions = descriptions
        .iter()
        .filter(|(name, _)| chosen.iter().any(|doc| &doc.name == *name))
        .map(|(name, desc)| (name.clone(), desc.clone()))
        .collect();

    Selection {
        documents: chosen,
        descriptions,
    }
}

/// A profile's document storage
#[derive(Debug, Clone)]
pub struct DocumentLibrary {
    data_dir: PathBuf,
    selected_dir: PathBuf,
}

impl DocumentLibrary {
    /// Library of a profile
    pub fn new(profile: &Profile) -> Self {
        Self::with_dirs(profile.data_dir(), profile.selected_dir())
    }

    /// Library over explicit directories
    pub fn with_dirs(data_dir: impl Into<PathBuf>, selected_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            selected_dir: selected_dir.into(),
        }
    }

    /// Directory holding the master documents
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding the materialized selection
    pub fn selected_dir(&self) -> &Path {
        &self.selected_dir
    }

    /// Path of the master description map
    pub fn descriptions_path(&self) -> PathBuf {
        self.data_dir.join(DESCRIPTIONS_FILE)
    }

    /// Destination of the extracted text for an uploaded file
    pub fn text_path_for(&self, source: &Path) -> Result<PathBuf> {
        let name = document_name(source).ok_or_else(|| {
            ChatfolioError::Ingestion(format!("Unusable file name: {}", source.display()))
        })?;
        Ok(self.document_path(&name))
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", name, DOCUMENT_EXTENSION))
    }

    /// Master documents, in name order
    pub fn documents(&self) -> Result<Vec<Document>> {
        if !self.data_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)
            .with_context(|| format!("Failed to list {}", self.data_dir.display()))?
        {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION)
            {
                continue;
            }
            if let Some(name) = document_name(&path) {
                documents.push(Document { name, path });
            }
        }
        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(documents)
    }

    /// Master description map
    pub fn descriptions(&self) -> DescriptionMap {
        load_descriptions(&self.descriptions_path())
    }

    /// Set one document's description, keeping the others
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if the document is not in the library
    pub fn set_description(&self, name: &str, description: &str) -> Result<()> {
        let name = self.resolve(name)?;
        let mut descriptions = self.descriptions();
        descriptions.insert(name.clone(), description.trim().to_string());
        save_descriptions(&self.descriptions_path(), &descriptions)?;
        tracing::info!("Updated description for {}", name);
        Ok(())
    }

    /// Map a user-supplied name (with or without extension) to a document
    /// base name
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if no such document exists
    pub fn resolve(&self, name: &str) -> Result<String> {
        let trimmed = name.trim();
        if !trimmed.contains('/') && !trimmed.contains('\\') {
            let stem = Path::new(trimmed).file_stem().and_then(|s| s.to_str());
            for base in std::iter::once(trimmed).chain(stem) {
                if !base.is_empty() && self.document_path(base).is_file() {
                    return Ok(base.to_string());
                }
            }
        }
        Err(ChatfolioError::DocumentNotFound(name.to_string()).into())
    }

    /// Names of the documents currently materialized in the selection
    pub fn selected_names(&self) -> Result<Vec<String>> {
        if !self.selected_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.selected_dir)? {
            let path = entry?.path();
            if path.is_file() && !super::is_metadata(&path) {
                if let Some(name) = document_name(&path) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Finalize a selection and materialize it
    ///
    /// An empty list clears the selection, which sends later questions down
    /// the plain completion path.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` for a name outside the library, before
    /// anything on disk changes
    pub fn select(&self, names: &[String]) -> Result<Selection> {
        let mut selected = BTreeSet::new();
        for name in names {
            selected.insert(self.resolve(name)?);
        }

        let selection = derive_selection(&self.documents()?, &self.descriptions(), &selected);
        self.materialize(&selection)?;
        Ok(selection)
    }

    /// Write a selection into the selection directory
    ///
    /// Copies every selected document, removes everything else, and writes
    /// the filtered description map.
    pub fn materialize(&self, selection: &Selection) -> Result<()> {
        std::fs::create_dir_all(&self.selected_dir)
            .with_context(|| format!("Failed to create {}", self.selected_dir.display()))?;

        let mut keep = BTreeSet::new();
        for doc in &selection.documents {
            let file_name = doc
                .path
                .file_name()
                .ok_or_else(|| ChatfolioError::DocumentNotFound(doc.name.clone()))?;
            std::fs::copy(&doc.path, self.selected_dir.join(file_name))
                .with_context(|| format!("Failed to copy {}", doc.path.display()))?;
            keep.insert(file_name.to_os_string());
        }

        for entry in std::fs::read_dir(&self.selected_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() && !keep.contains(&entry.file_name()) {
                std::fs::remove_file(entry.path())?;
            }
        }

        save_descriptions(
            &self.selected_dir.join(SELECTED_DESCRIPTIONS_FILE),
            &selection.descriptions,
        )?;

        tracing::info!(
            "Materialized selection of {} document(s)",
            selection.documents.len()
        );
        Ok(())
    }

    /// Read the materialized selection back
    ///
    /// Documents come from the selection directory and descriptions from
    /// its filtered map.
    pub fn load_selection(&self) -> Result<Selection> {
        let mut documents = Vec::new();
        if self.selected_dir.is_dir() {
            for entry in std::fs::read_dir(&self.selected_dir)? {
                let path = entry?.path();
                if !path.is_file() || super::is_metadata(&path) {
                    continue;
                }
                if let Some(name) = document_name(&path) {
                    documents.push(Document { name, path });
                }
            }
        }
        documents.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Selection {
            documents,
            descriptions: load_descriptions(&self.selected_dir.join(SELECTED_DESCRIPTIONS_FILE)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::documents_available;
    use tempfile::TempDir;

    fn library_with(docs: &[(&str, &str)]) -> (DocumentLibrary, TempDir) {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("user_data_storage");
        std::fs::create_dir_all(&data).unwrap();
        for (name, body) in docs {
            std::fs::write(data.join(format!("{}.txt", name)), body).unwrap();
        }
        let library = DocumentLibrary::with_dirs(&data, data.join("selected_files"));
        (library, tmp)
    }

    #[test]
    fn test_derive_selection_is_pure() {
        let docs = vec![
            Document {
                name: "memo".into(),
                path: "memo.txt".into(),
            },
            Document {
                name: "report".into(),
                path: "report.txt".into(),
            },
        ];
        let mut descriptions = DescriptionMap::new();
        descriptions.insert("memo".into(), "internal memo".into());
        descriptions.insert("report".into(), "quarterly earnings".into());
        descriptions.insert("orphan".into(), "no document".into());
        let selected = BTreeSet::from(["report".to_string(), "ghost".to_string()]);

        let first = derive_selection(&docs, &descriptions, &selected);
        let second = derive_selection(&docs, &descriptions, &selected);
        assert_eq!(first, second);
        assert_eq!(first.documents, vec![docs[1].clone()]);
        assert_eq!(first.descriptions.len(), 1);
        assert_eq!(first.descriptions["report"], "quarterly earnings");
    }

    #[test]
    fn test_documents_lists_only_text_files() {
        let (library, _tmp) = library_with(&[("b", "B"), ("a", "A")]);
        std::fs::write(library.descriptions_path(), "{}").unwrap();
        std::fs::create_dir_all(library.selected_dir()).unwrap();

        let names: Vec<String> = library
            .documents()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_select_materializes_and_prunes() {
        let (library, _tmp) = library_with(&[("memo", "M"), ("report", "R")]);
        library.set_description("report", "quarterly earnings").unwrap();
        library.set_description("memo.txt", "internal memo").unwrap();

        library
            .select(&["memo".to_string(), "report".to_string()])
            .unwrap();
        assert_eq!(library.selected_names().unwrap(), vec!["memo", "report"]);

        let selection = library.select(&["report".to_string()]).unwrap();
        assert_eq!(selection.documents.len(), 1);
        assert_eq!(library.selected_names().unwrap(), vec!["report"]);
        assert!(!library.selected_dir().join("memo.txt").exists());

        let loaded = library.load_selection().unwrap();
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(loaded.descriptions["report"], "quarterly earnings");
        assert!(!loaded.descriptions.contains_key("memo"));
    }

    #[test]
    fn test_empty_selection_disables_documents() {
        let (library, _tmp) = library_with(&[("report", "R")]);
        library.select(&["report".to_string()]).unwrap();
        assert!(documents_available(library.selected_dir()));

        library.select(&[]).unwrap();
        assert!(!documents_available(library.selected_dir()));
        assert!(library
            .selected_dir()
            .join(SELECTED_DESCRIPTIONS_FILE)
            .is_file());
    }

    #[test]
    fn test_select_unknown_document_changes_nothing() {
        let (library, _tmp) = library_with(&[("report", "R")]);
        library.select(&["report".to_string()]).unwrap();

        let err = library
            .select(&["report".to_string(), "ghost".to_string()])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatfolioError>(),
            Some(ChatfolioError::DocumentNotFound(_))
        ));
        assert_eq!(library.selected_names().unwrap(), vec!["report"]);
    }

    #[test]
    fn test_set_description_merges() {
        let (library, _tmp) = library_with(&[("a", "A"), ("b", "B")]);
        library.set_description("a", "first").unwrap();
        library.set_description("b", "second").unwrap();
        library.set_description("a", " updated ").unwrap();

        let descriptions = library.descriptions();
        assert_eq!(descriptions["a"], "updated");
        assert_eq!(descriptions["b"], "second");
        assert!(library.set_description("missing", "x").is_err());
    }

    #[test]
    fn test_text_path_for_upload() {
        let (library, _tmp) = library_with(&[]);
        let path = library
            .text_path_for(Path::new("/uploads/Annual Report.pdf"))
            .unwrap();
        assert_eq!(path, library.data_dir().join("Annual Report.txt"));
    }
}
