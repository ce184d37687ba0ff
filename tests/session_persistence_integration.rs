mod common;

use chatfolio::session::{Role, SessionLog, Turn};
use chatfolio::ChatfolioError;

#[test]
fn test_session_survives_restart() {
    let (_tmp, profile) = common::temp_profile("alice");

    let name = {
        let mut log = SessionLog::open(&profile).unwrap();
        let mut pending = vec![Turn::user("hello"), Turn::assistant("hi")];
        log.append(&mut pending).unwrap();
        assert!(pending.is_empty());
        log.current_name().unwrap()
    };
    assert!(name.starts_with("alice_Session_"));

    // A new process resumes the most recent session and keeps appending
    let mut log = SessionLog::open_latest(&profile).unwrap();
    assert_eq!(log.current_name().as_deref(), Some(name.as_str()));
    let mut pending = vec![Turn::user("still there?"), Turn::assistant("yes")];
    log.append(&mut pending).unwrap();

    let transcript = log.read(&name).unwrap();
    let roles: Vec<Role> = transcript.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(transcript[2].content, "still there?");
}

#[test]
fn test_session_file_format() {
    let (_tmp, profile) = common::temp_profile("alice");
    let mut log = SessionLog::open(&profile).unwrap();
    let mut pending = vec![Turn::user("hello"), Turn::assistant("hi")];
    log.append(&mut pending).unwrap();

    let raw = std::fs::read_to_string(log.current_path().unwrap()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value,
        serde_json::json!([
            {"role": "user", "content": "hello"},
            {"role": "assistant", "content": "hi"}
        ])
    );
    assert!(raw.contains("\n    {"), "expected 4-space indentation:\n{}", raw);
}

#[test]
fn test_corrupt_session_reads_as_empty() {
    let (_tmp, profile) = common::temp_profile("alice");
    let history = profile.history_dir();
    std::fs::write(history.join("broken.json"), "{not json").unwrap();

    let mut log = SessionLog::open(&profile).unwrap();
    assert!(log.read("broken").unwrap().is_empty());

    // Appending to a corrupt session starts it over from the pending turns
    log.bind("broken").unwrap();
    let mut pending = vec![Turn::user("fresh start")];
    log.append(&mut pending).unwrap();
    assert_eq!(log.read("broken").unwrap().len(), 1);
}

#[test]
fn test_rename_collision_leaves_both_sessions() {
    let (_tmp, profile) = common::temp_profile("alice");
    let history = profile.history_dir();
    std::fs::write(history.join("first.json"), r#"[{"role":"user","content":"one"}]"#).unwrap();
    std::fs::write(history.join("second.json"), r#"[{"role":"user","content":"two"}]"#).unwrap();

    let mut log = SessionLog::open(&profile).unwrap();
    let err = log.rename("first", "second").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChatfolioError>(),
        Some(ChatfolioError::NameCollision(_))
    ));

    assert_eq!(log.read("first").unwrap()[0].content, "one");
    assert_eq!(log.read("second").unwrap()[0].content, "two");
}

#[test]
fn test_rename_and_delete_follow_binding() {
    let (_tmp, profile) = common::temp_profile("alice");
    let mut log = SessionLog::open(&profile).unwrap();
    let mut pending = vec![Turn::user("hello")];
    log.append(&mut pending).unwrap();
    let name = log.current_name().unwrap();

    log.rename(&name, "Budget review.json").unwrap();
    assert_eq!(log.current_name().as_deref(), Some("Budget review"));

    let mut pending = vec![Turn::assistant("noted")];
    log.append(&mut pending).unwrap();
    assert_eq!(log.read("Budget review").unwrap().len(), 2);

    log.delete("Budget review").unwrap();
    assert!(log.current_name().is_none());
    assert!(log.list().unwrap().is_empty());
}

#[test]
fn test_list_most_recent_first() {
    let (_tmp, profile) = common::temp_profile("alice");
    let history = profile.history_dir();
    std::fs::write(history.join("older.json"), "[]").unwrap();
    std::fs::write(history.join("newer.json"), r#"[{"role":"user","content":"x"}]"#).unwrap();
    let past = std::time::SystemTime::now() - std::time::Duration::from_secs(600);
    std::fs::File::options()
        .write(true)
        .open(history.join("older.json"))
        .unwrap()
        .set_modified(past)
        .unwrap();
    std::fs::write(history.join("notes.txt"), "ignored").unwrap();

    let sessions = SessionLog::open(&profile).unwrap().list().unwrap();
    let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["newer", "older"]);
    assert_eq!(sessions[0].turn_count, 1);
}
