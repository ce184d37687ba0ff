//! Profile store
//!
//! Every profile is a directory under the profiles root:
//!
//! ```text
//! <root>/<profile>/tokens/api_info.env
//! <root>/<profile>/chat_history/<session>.json
//! <root>/<profile>/user_data_storage/<document>.txt
//! <root>/<profile>/user_data_storage/descriptions.json
//! <root>/<profile>/user_data_storage/selected_files/
//! ```
//!
//! The credential record is read on demand and handed to gateway clients
//! explicitly; it is never exported into the process environment.

use crate::error::{ChatfolioError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Directory holding the credential record
pub const TOKENS_DIR: &str = "tokens";
/// Credential record file name
pub const CREDENTIAL_FILE: &str = "api_info.env";
/// Directory holding session files
pub const HISTORY_DIR: &str = "chat_history";
/// Directory holding extracted document bodies and the description map
pub const DATA_DIR: &str = "user_data_storage";
/// Directory holding the materialized document selection
pub const SELECTED_DIR: &str = "selected_files";
/// Key that must be present in the credential record
pub const API_KEY: &str = "API_KEY";

/// Filesystem-backed namespace of profiles
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// Create a store rooted at `root`
    ///
    /// The root is created lazily by [`ProfileStore::create`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Profiles root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that a profile name is usable as a single directory component
    ///
    /// # Errors
    ///
    /// Returns `ChatfolioError::InvalidProfileName` for empty names, names
    /// containing path separators, and `.`/`..`
    pub fn validate_name(name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed != name
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(ChatfolioError::InvalidProfileName(name.to_string()).into());
        }
        Ok(())
    }

    /// Whether a profile directory exists
    pub fn exists(&self, name: &str) -> bool {
        Self::validate_name(name).is_ok() && self.root.join(name).is_dir()
    }

    /// Create a new profile with its credential record
    ///
    /// # Arguments
    ///
    /// * `name` - Profile name
    /// * `api_key` - API key stored in the credential record
    ///
    /// # Errors
    ///
    /// Returns `ProfileExists` if the profile is already present and
    /// `MissingCredentials` if the key is empty
    pub fn create(&self, name: &str, api_key: &str) -> Result<Profile> {
        Self::validate_name(name)?;
        if self.exists(name) {
            return Err(ChatfolioError::ProfileExists(name.to_string()).into());
        }

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ChatfolioError::MissingCredentials(name.to_string()).into());
        }

        let profile = Profile {
            name: name.to_string(),
            dir: self.root.join(name),
        };
        std::fs::create_dir_all(profile.dir.join(TOKENS_DIR))?;
        std::fs::create_dir_all(profile.history_dir())?;
        std::fs::create_dir_all(profile.data_dir())?;

        let credential_path = profile.credential_path();
        std::fs::write(&credential_path, format!("{}=\"{}\"\n", API_KEY, api_key))?;
        restrict_permissions(&credential_path);

        tracing::info!("Created profile '{}' at {}", name, profile.dir.display());
        Ok(profile)
    }

    /// Open an existing profile
    ///
    /// # Errors
    ///
    /// Returns `ProfileNotFound` if the profile directory is missing
    pub fn open(&self, name: &str) -> Result<Profile> {
        Self::validate_name(name)?;
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(ChatfolioError::ProfileNotFound(name.to_string()).into());
        }
        Ok(Profile {
            name: name.to_string(),
            dir,
        })
    }

    /// List profile names in alphabetical order
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Could not restrict permissions on {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

/// A resolved profile directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    dir: PathBuf,
}

impl Profile {
    /// Profile name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Profile root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding session files
    pub fn history_dir(&self) -> PathBuf {
        self.dir.join(HISTORY_DIR)
    }

    /// Directory holding extracted documents and the master description map
    pub fn data_dir(&self) -> PathBuf {
        self.dir.join(DATA_DIR)
    }

    /// Directory holding the materialized document selection
    pub fn selected_dir(&self) -> PathBuf {
        self.data_dir().join(SELECTED_DIR)
    }

    /// Path of the credential record
    pub fn credential_path(&self) -> PathBuf {
        self.dir.join(TOKENS_DIR).join(CREDENTIAL_FILE)
    }

    /// Read the API key from the credential record
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` if the record is absent, lacks
    /// `API_KEY`, or holds an empty value
    pub fn load_credentials(&self) -> Result<Credentials> {
        let path = self.credential_path();
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            tracing::error!("Cannot read credential record {}: {}", path.display(), e);
            ChatfolioError::MissingCredentials(self.name.clone())
        })?;

        let api_key = parse_credential_record(&contents)
            .remove(API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                tracing::error!("No {} found in {}", API_KEY, path.display());
                ChatfolioError::MissingCredentials(self.name.clone())
            })?;

        Ok(Credentials { api_key })
    }
}

/// API credentials loaded from a profile
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Wrap an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// The bearer token for gateway requests
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn assignment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.*?)\s*$")
            .expect("credential pattern is valid")
    })
}

/// Parse a `KEY=value` record
///
/// Blank lines and `#` comments are skipped. Values may be wrapped in
/// single or double quotes. Later assignments win.
pub fn parse_credential_record(contents: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(caps) = assignment_pattern().captures(line) {
            let value = unquote(&caps[2]);
            values.insert(caps[1].to_string(), value.to_string());
        }
    }
    values
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
