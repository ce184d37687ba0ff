use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatfolio::profile::{Profile, ProfileStore};
use chatfolio::Config;

/// Configuration pointing both gateways at `api_base`
#[allow(dead_code)]
pub fn config_for(api_base: &str, profiles_dir: &Path) -> Config {
    let mut config = Config {
        profiles_dir: profiles_dir.to_path_buf(),
        ..Config::default()
    };
    config.completion.api_base = api_base.to_string();
    config.completion.model = "test-model".to_string();
    config.completion.request_timeout_seconds = 5;
    config.documents.embedding_model = "test-embedding".to_string();
    config
}

/// Profiles root with one profile created in it
#[allow(dead_code)]
pub fn temp_profile(name: &str) -> (TempDir, Profile) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let profile = ProfileStore::new(tmp.path())
        .create(name, &format!("sk-{}", name))
        .expect("failed to create profile");
    (tmp, profile)
}

/// OpenAI-style completion body with a single choice
#[allow(dead_code)]
pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// Answer every completion request with `content`
#[allow(dead_code)]
pub async fn mount_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(server)
        .await;
}

/// Answer every embedding request with one fixed vector
#[allow(dead_code)]
pub async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3]}]
        })))
        .mount(server)
        .await;
}

/// Decoded JSON bodies of every request the server received on `endpoint`
#[allow(dead_code)]
pub async fn request_bodies(server: &MockServer, endpoint: &str) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == endpoint)
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}
