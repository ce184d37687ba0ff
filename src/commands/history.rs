use crate::cli::HistoryCommand;
use crate::commands::{confirm, open_profile};
use crate::config::Config;
use crate::error::Result;
use crate::session::{Role, SessionDescriptor, SessionLog, Turn};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List { profile } => {
            let profile = open_profile(config, &profile)?;
            let log = SessionLog::open(&profile)?;
            print_sessions(&log.list()?, None);
            println!(
                "Use {} to resume a session.",
                format!("chatfolio chat -p {} --session <NAME>", profile.name()).cyan()
            );
            println!();
        }
        HistoryCommand::Show { profile, session } => {
            let profile = open_profile(config, &profile)?;
            let log = SessionLog::open(&profile)?;
            let transcript = log.read(&session)?;
            println!("\n{}", session.bold());
            print_transcript(&transcript);
        }
        HistoryCommand::Rename {
            profile,
            from,
            to,
            yes,
        } => {
            let profile = open_profile(config, &profile)?;
            let mut log = SessionLog::open(&profile)?;
            if !yes && !confirm(&format!("Rename session {} to {}?", from, to))? {
                println!("{}", "Rename cancelled.".yellow());
                return Ok(());
            }
            let path = log.rename(&from, &to)?;
            let new_name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(to);
            println!("{}", format!("Renamed {} to {}", from, new_name).green());
        }
        HistoryCommand::Delete {
            profile,
            session,
            yes,
        } => {
            let profile = open_profile(config, &profile)?;
            let mut log = SessionLog::open(&profile)?;
            if !yes && !confirm(&format!("Delete session {}? This cannot be undone.", session))? {
                println!("{}", "Delete cancelled.".yellow());
                return Ok(());
            }
            log.delete(&session)?;
            println!("{}", format!("Deleted session {}", session).green());
        }
    }

    Ok(())
}

/// Print a session table, marking `current` when given
pub fn print_sessions(sessions: &[SessionDescriptor], current: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", "No sessions found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "Name".bold(),
        "Turns".bold(),
        "Last Updated".bold()
    ]);

    for session in sessions {
        let name = if current == Some(session.name.as_str()) {
            format!("{} *", session.name).green()
        } else {
            session.name.cyan()
        };
        let updated = session.modified.format("%Y-%m-%d %H:%M").to_string();
        table.add_row(prettytable::row![name, session.turn_count, updated]);
    }

    println!("\nSessions:");
    table.printstd();
    println!();
}

fn role_label(role: Role) -> colored::ColoredString {
    match role {
        Role::User => "You".cyan().bold(),
        Role::Assistant => "Assistant".green().bold(),
        Role::System => "System".yellow().bold(),
    }
}

/// Print every turn of a transcript
pub fn print_transcript(transcript: &[Turn]) {
    if transcript.is_empty() {
        println!("{}\n", "No messages in this session.".yellow());
        return;
    }

    for turn in transcript {
        println!("{}: {}", role_label(turn.role), turn.content);
    }
    println!();
}
