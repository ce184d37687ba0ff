//! Profile management commands

use crate::cli::ProfileCommand;
use crate::commands::open_profile;
use crate::config::Config;
use crate::documents::DocumentLibrary;
use crate::error::Result;
use crate::profile::ProfileStore;
use crate::session::SessionLog;

use colored::Colorize;
use rustyline::DefaultEditor;

/// Handle profile commands
pub fn handle_profile(config: &Config, command: ProfileCommand) -> Result<()> {
    let store = ProfileStore::new(&config.profiles_dir);

    match command {
        ProfileCommand::Create { name, api_key } => {
            ProfileStore::validate_name(&name)?;
            let api_key = match api_key {
                Some(key) => key,
                None => prompt_api_key()?,
            };
            let profile = store.create(&name, &api_key)?;
            println!(
                "{}",
                format!("Created profile {} at {}", name, profile.dir().display()).green()
            );
        }
        ProfileCommand::List => {
            let names = store.list()?;
            if names.is_empty() {
                println!("{}", "No profiles found.".yellow());
                println!(
                    "Use {} to create one.",
                    "chatfolio profile create <NAME>".cyan()
                );
                return Ok(());
            }
            println!("\nProfiles:");
            for name in names {
                println!("  {}", name.cyan());
            }
            println!();
        }
        ProfileCommand::Show { name } => {
            let profile = open_profile(config, &name)?;
            let credentials = if profile.load_credentials().is_ok() {
                "present".green()
            } else {
                "missing".red()
            };
            let sessions = SessionLog::open(&profile)?.list()?.len();
            let library = DocumentLibrary::new(&profile);
            let documents = library.documents()?.len();
            let selected = library.selected_names()?;

            println!("\nProfile:    {}", profile.name().cyan().bold());
            println!("Directory:  {}", profile.dir().display());
            println!("API key:    {}", credentials);
            println!("Sessions:   {}", sessions);
            println!("Documents:  {}", documents);
            if selected.is_empty() {
                println!("Selected:   {}", "none".dimmed());
            } else {
                println!("Selected:   {}", selected.join(", "));
            }
            println!();
        }
    }

    Ok(())
}

fn prompt_api_key() -> Result<String> {
    let mut rl = DefaultEditor::new()?;
    let key = rl.readline("API key: ")?;
    Ok(key.trim().to_string())
}
