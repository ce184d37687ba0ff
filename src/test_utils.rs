//! Test utilities for Chatfolio
//!
//! This module provides common test utilities including temporary profile
//! roots, test file creation, and assertion helpers.

use crate::config::Config;
use crate::error::Result;
use crate::profile::{Profile, ProfileStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration rooted at `profiles_dir`
pub fn test_config(profiles_dir: &Path) -> Config {
    Config {
        profiles_dir: profiles_dir.to_path_buf(),
        ..Config::default()
    }
}

/// Create a profile with a test API key under `root`
///
/// # Panics
///
/// Panics if the profile cannot be created
pub fn test_profile(root: &Path, name: &str) -> Profile {
    ProfileStore::new(root)
        .create(name, &format!("sk-{}", name))
        .expect("Failed to create test profile")
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
profiles_dir: /tmp/chatfolio-profiles
completion:
  api_base: http://localhost:8080/v1
  model: gpt-4o-mini
  max_tokens: 512
  temperature: 0.2
  request_timeout_seconds: 30
documents:
  embedding_model: text-embedding-3-small
  chunk_size: 800
  chunk_overlap: 100
  similarity_top_k: 3
  max_sub_questions: 4
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatfolioError;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(dir.path(), "test.txt", "content");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "content");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(ChatfolioError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    #[should_panic(expected = "does not contain")]
    fn test_assert_error_contains_wrong_message() {
        let result: Result<()> = Err(ChatfolioError::Config("different error".to_string()).into());
        assert_error_contains(result, "not present");
    }

    #[test]
    fn test_test_profile() {
        let dir = temp_dir();
        let profile = test_profile(dir.path(), "alice");
        assert_eq!(profile.load_credentials().unwrap().api_key(), "sk-alice");
    }

    #[test]
    fn test_test_config_yaml() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.documents.similarity_top_k, 3);
        assert!(test_config(Path::new("/tmp/x")).validate().is_ok());
    }
}
