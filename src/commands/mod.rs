/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`    : Interactive chat session
- `profile` : Profile creation and inspection
- `history` : Session listing, display, rename, and delete
- `docs`    : Document upload, description, and selection
*/

use crate::config::Config;
use crate::error::Result;
use crate::profile::{Profile, ProfileStore};

use std::io::{BufRead, Write};

pub mod docs;
pub mod history;
pub mod profile;

// Special commands parser for the chat loop
pub mod special_commands;

/// Open a profile under the configured profiles root
pub(crate) fn open_profile(config: &Config, name: &str) -> Result<Profile> {
    ProfileStore::new(&config.profiles_dir).open(name)
}

/// Whether a confirmation answer means yes
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Ask a yes/no question on stdin, defaulting to no
pub(crate) fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

/// Shorten `text` to at most `max` characters, marking the cut with "..."
pub fn truncate(text: &str, max: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let kept: String = single_line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Opens the profile, builds the query router, and runs a
    //! readline-based loop that submits user input through the session
    //! controller. Replies arrive as controller events.

    use super::*;
    use crate::commands::history::{print_sessions, print_transcript};
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::controller::{SessionController, SubmitOutcome, TurnEvent, TurnState};
    use crate::router::QueryRouter;
    use crate::session::SessionLog;

    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Start an interactive chat session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `profile_name` - Profile to chat as
    /// * `session` - Session to resume instead of the most recent one
    /// * `new` - Start a fresh session even if history exists
    ///
    /// # Errors
    ///
    /// Returns error if the profile does not exist, has no API key, or the
    /// requested session cannot be found
    pub async fn run_chat(
        config: Config,
        profile_name: String,
        session: Option<String>,
        new: bool,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat for profile {}", profile_name);

        let profile = open_profile(&config, &profile_name)?;
        let router = Arc::new(QueryRouter::for_profile(&config, &profile)?);
        let log = open_log(&profile, session.as_deref(), new)?;
        let (controller, mut events) = SessionController::new(log, router);

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(
            profile.name(),
            controller.current_session().await.as_deref(),
            controller.transcript().await.len(),
            controller.documents_available(),
        );

        loop {
            drain_events(&mut events);

            let prompt = format!("[{}]>> ", profile.name()).cyan().to_string();
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::None) => {}
                        Ok(SpecialCommand::Exit) => break,
                        Ok(command) => {
                            if let Err(e) =
                                handle_special_command(&controller, profile.name(), command).await
                            {
                                eprintln!("{}\n", format!("Error: {:#}", e).red());
                            }
                            continue;
                        }
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    }

                    match controller.submit(trimmed).await {
                        Ok(SubmitOutcome::Ignored) => {}
                        Ok(SubmitOutcome::Dispatched(handle)) => {
                            drain_events(&mut events);
                            tokio::select! {
                                joined = handle => {
                                    if let Err(e) = joined {
                                        tracing::error!("Reply task failed: {}", e);
                                    }
                                }
                                _ = tokio::signal::ctrl_c() => {
                                    println!(
                                        "\n{}",
                                        "Stopped waiting; the reply will be saved when it arrives."
                                            .yellow()
                                    );
                                }
                            }
                            drain_events(&mut events);
                        }
                        Err(e) => {
                            eprintln!("{}\n", format!("Error: {:#}", e).red());
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(name) = controller.current_session().await {
            println!("Session saved as {}", name.cyan());
        }
        println!("Goodbye!");
        Ok(())
    }

    /// Open the session log the chat should start in
    ///
    /// `--new` starts unbound, `--session` binds the named session, and the
    /// default resumes the most recent one.
    pub(crate) fn open_log(
        profile: &crate::profile::Profile,
        session: Option<&str>,
        new: bool,
    ) -> Result<SessionLog> {
        if new {
            return SessionLog::open(profile);
        }
        match session {
            Some(name) => {
                let mut log = SessionLog::open(profile)?;
                log.bind(name)?;
                Ok(log)
            }
            None => SessionLog::open_latest(profile),
        }
    }

    /// Print whatever the controller has emitted so far
    fn drain_events(events: &mut UnboundedReceiver<TurnEvent>) {
        while let Ok(event) = events.try_recv() {
            match event {
                TurnEvent::Thinking => {
                    print!("{}", "Thinking...".dimmed());
                    let _ = std::io::stdout().flush();
                }
                TurnEvent::Reply(reply) => {
                    // Replace the placeholder line
                    print!("\r\x1b[K");
                    println!("{}\n", reply);
                }
            }
        }
    }

    async fn handle_special_command(
        controller: &SessionController,
        profile: &str,
        command: SpecialCommand,
    ) -> Result<()> {
        match command {
            SpecialCommand::NewSession => {
                controller.start_new_session().await?;
                println!(
                    "{}\n",
                    "Started a new session. It is saved with your first message.".green()
                );
            }
            SpecialCommand::ListSessions => {
                let sessions = controller.sessions().await?;
                print_sessions(&sessions, controller.current_session().await.as_deref());
            }
            SpecialCommand::LoadSession(name) => {
                let transcript = controller.resume(&name).await?;
                println!(
                    "{}",
                    format!("Resumed {} ({} turns)", name, transcript.len()).green()
                );
                print_transcript(&transcript);
            }
            SpecialCommand::ShowHistory => {
                print_transcript(&controller.transcript().await);
            }
            SpecialCommand::ShowStatus => {
                print_status_display(
                    profile,
                    controller.current_session().await.as_deref(),
                    controller.transcript().await.len(),
                    controller.documents_available(),
                    controller.state().await,
                );
            }
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit | SpecialCommand::None => {}
        }
        Ok(())
    }

    fn answer_source(documents_available: bool) -> colored::ColoredString {
        if documents_available {
            "selected documents".magenta()
        } else {
            "conversation".blue()
        }
    }

    /// Display the welcome banner at the start of a chat
    fn print_welcome_banner(
        profile: &str,
        session: Option<&str>,
        turns: usize,
        documents_available: bool,
    ) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              Chatfolio Interactive Chat - Welcome!           ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Profile: {}", profile.cyan());
        match session {
            Some(name) => println!("Session: {} ({} turns)", name.cyan(), turns),
            None => println!("Session: {}", "new".green()),
        }
        println!("Answers: {}\n", answer_source(documents_available));
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    /// Display detailed status information for `/status`
    fn print_status_display(
        profile: &str,
        session: Option<&str>,
        turns: usize,
        documents_available: bool,
        state: TurnState,
    ) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Chatfolio Session Status                  ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Profile:           {}", profile.cyan());
        println!(
            "Session:           {}",
            session.unwrap_or("(not yet saved)").cyan()
        );
        println!("Conversation Size: {} turns", turns);
        println!("Answer Source:     {}", answer_source(documents_available));
        println!("Turn State:        {:?}", state);
        println!();
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::profile::ProfileStore;
        use crate::session::Turn;
        use tempfile::TempDir;

        fn profile_with_session() -> (crate::profile::Profile, String, TempDir) {
            let tmp = TempDir::new().unwrap();
            let store = ProfileStore::new(tmp.path());
            let profile = store.create("alice", "sk-test").unwrap();

            let mut log = SessionLog::open(&profile).unwrap();
            let mut pending = vec![Turn::user("hi"), Turn::assistant("hello")];
            log.append(&mut pending).unwrap();
            let name = log.current_name().unwrap();
            (profile, name, tmp)
        }

        #[test]
        fn test_open_log_new_is_unbound() {
            let (profile, _name, _tmp) = profile_with_session();
            let log = open_log(&profile, None, true).unwrap();
            assert!(log.current_name().is_none());
        }

        #[test]
        fn test_open_log_defaults_to_latest() {
            let (profile, name, _tmp) = profile_with_session();
            let log = open_log(&profile, None, false).unwrap();
            assert_eq!(log.current_name(), Some(name));
        }

        #[test]
        fn test_open_log_named_session() {
            let (profile, name, _tmp) = profile_with_session();
            let log = open_log(&profile, Some(&name), false).unwrap();
            assert_eq!(log.read_current().len(), 2);
        }

        #[test]
        fn test_open_log_missing_session() {
            let (profile, _name, _tmp) = profile_with_session();
            assert!(open_log(&profile, Some("nope"), false).is_err());
        }

        #[test]
        fn test_print_banners_do_not_panic() {
            print_welcome_banner("alice", None, 0, false);
            print_welcome_banner("alice", Some("alice_Session_x"), 4, true);
            print_status_display("alice", None, 0, true, TurnState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" YES\n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("yep"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a quarterly\nreport", 40), "a quarterly report");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }
}
