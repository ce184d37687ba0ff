//! Session log
//!
//! Durable storage of one conversation per JSON file under a profile's
//! `chat_history` directory. Each file holds an array of
//! `{role, content}` objects.
//!
//! [`SessionLog::append`] is a read-modify-write of the whole file: the
//! stored transcript is read, the pending turns are appended, and the
//! result is written back through a temp file and an atomic rename. Cost
//! grows with transcript length.

use crate::error::{ChatfolioError, Result};
use crate::profile::Profile;
use anyhow::Context;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub mod types;
pub use types::{Role, SessionDescriptor, Transcript, Turn};

const SESSION_EXTENSION: &str = "json";

/// Handle on a profile's session history
///
/// At most one session file is bound at a time. Until the first
/// [`append`](SessionLog::append), no file is selected.
#[derive(Debug, Clone)]
pub struct SessionLog {
    profile: String,
    history_dir: PathBuf,
    current: Option<PathBuf>,
}

impl SessionLog {
    /// Open the history directory of a profile, creating it if needed
    ///
    /// No session file is bound yet.
    pub fn open(profile: &Profile) -> Result<Self> {
        Self::open_dir(profile.name(), profile.history_dir())
    }

    /// Open a history directory directly
    pub fn open_dir(profile: &str, history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        std::fs::create_dir_all(&history_dir)
            .with_context(|| format!("Failed to create {}", history_dir.display()))?;

        Ok(Self {
            profile: profile.to_string(),
            history_dir,
            current: None,
        })
    }

    /// Open a profile's history and bind the most recently modified session
    ///
    /// Leaves the log unbound when the profile has no sessions yet.
    pub fn open_latest(profile: &Profile) -> Result<Self> {
        let mut log = Self::open(profile)?;
        if let Some(latest) = log.list()?.into_iter().next() {
            tracing::debug!("Auto-selected latest session {}", latest.name);
            log.current = Some(latest.path);
        }
        Ok(log)
    }

    /// Profile this log belongs to
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Directory holding the session files
    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// Path of the bound session file, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Name of the bound session, if any
    pub fn current_name(&self) -> Option<String> {
        self.current.as_deref().and_then(session_name_of)
    }

    /// Bind an existing session so later appends extend it
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no file with that name exists
    pub fn bind(&mut self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(ChatfolioError::SessionNotFound(name.to_string()).into());
        }
        self.current = Some(path);
        Ok(())
    }

    /// Forget the bound session; the next append starts a new one
    pub fn unbind(&mut self) {
        self.current = None;
    }

    /// Generate a fresh `{profile}_Session_{timestamp}` name
    ///
    /// A numeric suffix is added when a session with the same timestamp
    /// already exists.
    pub fn generate_session_name(&self) -> String {
        let base = format!(
            "{}_Session_{}",
            self.profile,
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        );

        let mut name = base.clone();
        let mut counter = 2;
        while self.file_for(&name).exists() {
            name = format!("{}_{}", base, counter);
            counter += 1;
        }
        name
    }

    /// Persist pending turns to the bound session
    ///
    /// Creates a new session file first if none is bound. The stored
    /// transcript is read (a missing or corrupt file counts as empty), the
    /// pending turns are appended in order, and the result is written back.
    /// `pending` is drained only after the write succeeds, so a failed
    /// write keeps the turns for the next attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be written
    pub fn append(&mut self, pending: &mut Vec<Turn>) -> Result<()> {
        let path = match &self.current {
            Some(path) => path.clone(),
            None => {
                let name = self.generate_session_name();
                let path = self.file_for(&name);
                write_transcript(&path, &[])?;
                tracing::info!("Started session {}", name);
                self.current = Some(path.clone());
                path
            }
        };

        let mut transcript = Self::load(&path);
        transcript.extend(pending.iter().cloned());
        write_transcript(&path, &transcript)?;

        tracing::debug!(
            "Persisted {} turn(s) to {} ({} total)",
            pending.len(),
            path.display(),
            transcript.len()
        );
        pending.clear();
        Ok(())
    }

    /// Read a transcript from a session file
    ///
    /// A missing, empty, or malformed file yields an empty transcript and a
    /// logged diagnostic. So does a file whose root is not an array.
    pub fn load(path: &Path) -> Transcript {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Session file not found: {}", path.display());
                return Transcript::new();
            }
            Err(e) => {
                tracing::warn!("Error reading session file {}: {}", path.display(), e);
                return Transcript::new();
            }
        };

        if contents.trim().is_empty() {
            return Transcript::new();
        }

        match serde_json::from_str::<Transcript>(&contents) {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!("Invalid JSON format in session file {}: {}", path.display(), e);
                Transcript::new()
            }
        }
    }

    /// Read the bound session's transcript (empty when unbound)
    pub fn read_current(&self) -> Transcript {
        match &self.current {
            Some(path) => Self::load(path),
            None => Transcript::new(),
        }
    }

    /// Read a named session's transcript
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no file with that name exists
    pub fn read(&self, name: &str) -> Result<Transcript> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(ChatfolioError::SessionNotFound(name.to_string()).into());
        }
        Ok(Self::load(&path))
    }

    /// List sessions, most recently modified first
    pub fn list(&self) -> Result<Vec<SessionDescriptor>> {
        let mut sessions = Vec::new();

        for entry in std::fs::read_dir(&self.history_dir)
            .with_context(|| format!("Failed to list {}", self.history_dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXTENSION)
            {
                continue;
            }
            let Some(name) = session_name_of(&path) else {
                continue;
            };

            let modified: DateTime<Local> = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(DateTime::from)
                .unwrap_or_else(|_| Local::now());

            sessions.push(SessionDescriptor {
                turn_count: Self::load(&path).len(),
                name,
                path,
                modified,
            });
        }

        sessions.sort_by(|a, b| b.modified.cmp(&a.modified).then(b.name.cmp(&a.name)));
        Ok(sessions)
    }

    /// Rename a session
    ///
    /// Never overwrites: an existing target is reported as
    /// `NameCollision` and both files are left untouched. The binding
    /// follows the session when the bound one is renamed.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `NameCollision`, or an IO error
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<PathBuf> {
        let from = self.path_for(old_name)?;
        let to = self.path_for(new_name)?;

        if !from.is_file() {
            return Err(ChatfolioError::SessionNotFound(old_name.to_string()).into());
        }
        if to.exists() {
            return Err(ChatfolioError::NameCollision(new_name.to_string()).into());
        }

        std::fs::rename(&from, &to)
            .with_context(|| format!("Failed to rename {} to {}", old_name, new_name))?;
        tracing::info!("Renamed session {} to {}", old_name, new_name);

        if self.current.as_deref() == Some(from.as_path()) {
            self.current = Some(to.clone());
        }
        Ok(to)
    }

    /// Delete a session file
    ///
    /// Unbinds the log when the bound session is deleted.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no file with that name exists
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(ChatfolioError::SessionNotFound(name.to_string()).into());
        }

        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete session {}", name))?;
        tracing::info!("Deleted session {}", name);

        if self.current.as_deref() == Some(path.as_path()) {
            self.current = None;
        }
        Ok(())
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        Ok(self.file_for(&normalize_session_name(name)?))
    }

    fn file_for(&self, name: &str) -> PathBuf {
        self.history_dir
            .join(format!("{}.{}", name, SESSION_EXTENSION))
    }
}

/// Validate a user-supplied session name and strip a trailing `.json`
///
/// # Errors
///
/// Returns `InvalidSessionName` for empty names and names that contain path
/// separators
pub fn normalize_session_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let stem = trimmed
        .strip_suffix(&format!(".{}", SESSION_EXTENSION))
        .unwrap_or(trimmed);

    if stem.is_empty()
        || stem == "."
        || stem == ".."
        || stem.contains('/')
        || stem.contains('\\')
    {
        return Err(ChatfolioError::InvalidSessionName(name.to_string()).into());
    }
    Ok(stem.to_string())
}

fn session_name_of(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// Write a transcript through a sibling temp file and an atomic rename
fn write_transcript(path: &Path, transcript: &[Turn]) -> Result<()> {
    use serde::Serialize;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    transcript
        .serialize(&mut serializer)
        .map_err(|e| ChatfolioError::Storage(format!("Failed to serialize transcript: {}", e)))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ChatfolioError::Storage(format!("Bad session path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    std::fs::write(&tmp, &buf)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
