use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `chatfolio` with an isolated profiles root and no config file
fn chatfolio(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chatfolio").expect("binary exists");
    cmd.arg("--config")
        .arg(tmp.path().join("missing.yaml"))
        .arg("--profiles-dir")
        .arg(tmp.path().join("profiles"))
        .env_remove("CHATFOLIO_API_KEY")
        .env_remove("CHATFOLIO_PROFILES_DIR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_profile_create_and_list() {
    let tmp = TempDir::new().unwrap();

    chatfolio(&tmp)
        .args(["profile", "create", "alice", "--api-key", "sk-alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created profile alice"));

    chatfolio(&tmp)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"));

    let record =
        std::fs::read_to_string(tmp.path().join("profiles/alice/tokens/api_info.env")).unwrap();
    assert!(record.contains("API_KEY=\"sk-alice\""));
}

#[test]
fn test_profile_create_duplicate_fails() {
    let tmp = TempDir::new().unwrap();
    chatfolio(&tmp)
        .args(["profile", "create", "alice", "--api-key", "sk-alice"])
        .assert()
        .success();

    chatfolio(&tmp)
        .args(["profile", "create", "alice", "--api-key", "sk-other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile already exists"));
}

#[test]
fn test_history_list_empty() {
    let tmp = TempDir::new().unwrap();
    chatfolio(&tmp)
        .args(["profile", "create", "alice", "--api-key", "sk-alice"])
        .assert()
        .success();

    chatfolio(&tmp)
        .args(["history", "list", "--profile", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions found."));
}

#[test]
fn test_history_rename_with_yes() {
    let tmp = TempDir::new().unwrap();
    chatfolio(&tmp)
        .args(["profile", "create", "alice", "--api-key", "sk-alice"])
        .assert()
        .success();
    let history = tmp.path().join("profiles/alice/chat_history");
    std::fs::write(
        history.join("alice_Session_2024-01-01_09-00-00.json"),
        r#"[{"role":"user","content":"hi"}]"#,
    )
    .unwrap();

    chatfolio(&tmp)
        .args([
            "history",
            "rename",
            "--profile",
            "alice",
            "alice_Session_2024-01-01_09-00-00",
            "Kickoff",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renamed"));
    assert!(history.join("Kickoff.json").is_file());
}

#[test]
fn test_docs_select_unknown_document_fails() {
    let tmp = TempDir::new().unwrap();
    chatfolio(&tmp)
        .args(["profile", "create", "bob", "--api-key", "sk-bob"])
        .assert()
        .success();

    chatfolio(&tmp)
        .args(["docs", "select", "--profile", "bob", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Document not found: ghost"));
}

#[test]
fn test_chat_unknown_profile_fails() {
    let tmp = TempDir::new().unwrap();
    chatfolio(&tmp)
        .args(["chat", "--profile", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile not found: nobody"));
}
