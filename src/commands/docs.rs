//! Document management commands
//!
//! Upload runs extraction on a worker and renders its progress events,
//! then asks the retrieval engine for a description of the new document.
//! Selection changes are materialized immediately, so the next chat turn
//! sees them.

use crate::cli::DocsCommand;
use crate::commands::{open_profile, truncate};
use crate::config::Config;
use crate::documents::{DocumentLibrary, EmbeddingIndex, IngestEvent, Ingestor};
use crate::error::{ChatfolioError, Result};
use crate::profile::Profile;
use crate::providers::{create_embedder, create_provider};

use colored::Colorize;
use prettytable::{format, Table};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Handle document commands
pub async fn handle_docs(config: &Config, command: DocsCommand) -> Result<()> {
    match command {
        DocsCommand::Upload {
            profile,
            file,
            no_describe,
        } => {
            let profile = open_profile(config, &profile)?;
            upload(config, &profile, file, no_describe).await?;
        }
        DocsCommand::List { profile } => {
            let profile = open_profile(config, &profile)?;
            print_documents(&DocumentLibrary::new(&profile))?;
        }
        DocsCommand::Select { profile, names } => {
            let profile = open_profile(config, &profile)?;
            let library = DocumentLibrary::new(&profile);
            let selection = library.select(&names)?;

            if selection.documents.is_empty() {
                println!(
                    "{}",
                    "Selection cleared. Questions go to the conversation model.".green()
                );
                return Ok(());
            }

            println!(
                "{}",
                format!("Selected {} document(s).", selection.documents.len()).green()
            );
            for doc in &selection.documents {
                if selection.descriptions.contains_key(&doc.name) {
                    println!("  {}", doc.name.cyan());
                } else {
                    println!(
                        "  {} {}",
                        doc.name.cyan(),
                        "(no description; skipped when answering)".yellow()
                    );
                }
            }
        }
        DocsCommand::Describe {
            profile,
            name,
            description,
        } => {
            let profile = open_profile(config, &profile)?;
            let library = DocumentLibrary::new(&profile);
            let name = library.resolve(&name)?;
            library.set_description(&name, &description)?;
            refresh_selection(&library)?;
            println!("{}", format!("Updated description for {}", name).green());
        }
    }

    Ok(())
}

async fn upload(
    config: &Config,
    profile: &Profile,
    file: PathBuf,
    no_describe: bool,
) -> Result<()> {
    let library = DocumentLibrary::new(profile);
    let ingestor = Ingestor::new(library.clone());
    let label = display_name(&file);

    let mut events = ingestor.spawn(file);
    let mut text_path = None;
    while let Some(event) = events.recv().await {
        match event {
            IngestEvent::Progress(percent) => {
                print!("\rExtracting {}... {:>3}%", label, percent);
                std::io::stdout().flush()?;
            }
            IngestEvent::Finished { path } => {
                println!();
                text_path = Some(path);
            }
            IngestEvent::Failed { error } => {
                println!();
                return Err(ChatfolioError::Ingestion(error).into());
            }
        }
    }

    let text_path = text_path.ok_or_else(|| {
        ChatfolioError::Ingestion(format!("Extraction of {} stopped unexpectedly", label))
    })?;
    println!(
        "{}",
        format!("Stored {} as {}", label, text_path.display()).green()
    );

    if no_describe {
        println!(
            "Add a description with {} before selecting it.",
            "chatfolio docs describe".cyan()
        );
    } else {
        let credentials = profile.load_credentials()?;
        let provider = create_provider(config, &credentials)?;
        let embedder = create_embedder(config, &credentials)?;
        let index = EmbeddingIndex::new(embedder, provider, &config.documents);

        println!("{}", "Generating description...".dimmed());
        match ingestor
            .describe(&text_path, &index, &config.documents.description_prompt)
            .await
        {
            Ok(description) => println!("Description: {}", description),
            Err(e) => {
                tracing::warn!("Describing {} failed: {:#}", text_path.display(), e);
                println!(
                    "{}",
                    format!(
                        "Could not generate a description ({:#}). Set one with `chatfolio docs describe`.",
                        e
                    )
                    .yellow()
                );
            }
        }
    }

    refresh_selection(&library)?;
    Ok(())
}

/// Re-materialize the current selection so it picks up new text and
/// descriptions
fn refresh_selection(library: &DocumentLibrary) -> Result<()> {
    let selected = library.selected_names()?;
    if !selected.is_empty() {
        library.select(&selected)?;
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_documents(library: &DocumentLibrary) -> Result<()> {
    let documents = library.documents()?;
    if documents.is_empty() {
        println!("{}", "No documents found.".yellow());
        println!(
            "Use {} to add one.",
            "chatfolio docs upload -p <PROFILE> <FILE>".cyan()
        );
        return Ok(());
    }

    let descriptions = library.descriptions();
    let selected = library.selected_names()?;

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "Name".bold(),
        "Selected".bold(),
        "Description".bold()
    ]);

    for doc in documents {
        let mark = if selected.contains(&doc.name) {
            "yes".green()
        } else {
            "".normal()
        };
        let description = descriptions
            .get(&doc.name)
            .map(|d| truncate(d, 60))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(prettytable::row![doc.name.cyan(), mark, description]);
    }

    println!("\nDocuments:");
    table.printstd();
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        assert_error_contains, create_test_file, temp_dir, test_config, test_profile,
    };
    use tempfile::TempDir;

    fn setup() -> (Config, Profile, TempDir) {
        let tmp = temp_dir();
        let config = test_config(&tmp.path().join("profiles"));
        let profile = test_profile(&config.profiles_dir, "bob");
        (config, profile, tmp)
    }

    #[tokio::test]
    async fn test_upload_without_description() {
        let (config, profile, tmp) = setup();
        let source = create_test_file(tmp.path(), "notes.md", "Quarterly revenue grew 12%.");

        handle_docs(
            &config,
            DocsCommand::Upload {
                profile: "bob".to_string(),
                file: source,
                no_describe: true,
            },
        )
        .await
        .unwrap();

        let stored = profile.data_dir().join("notes.txt");
        assert_eq!(
            std::fs::read_to_string(stored).unwrap(),
            "Quarterly revenue grew 12%."
        );
    }

    #[tokio::test]
    async fn test_upload_missing_file_fails() {
        let (config, _profile, tmp) = setup();
        let result = handle_docs(
            &config,
            DocsCommand::Upload {
                profile: "bob".to_string(),
                file: tmp.path().join("missing.pdf"),
                no_describe: true,
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_describe_refreshes_selection() {
        let (config, profile, _tmp) = setup();
        std::fs::write(profile.data_dir().join("report.txt"), "Revenue").unwrap();

        handle_docs(
            &config,
            DocsCommand::Select {
                profile: "bob".to_string(),
                names: vec!["report.txt".to_string()],
            },
        )
        .await
        .unwrap();

        handle_docs(
            &config,
            DocsCommand::Describe {
                profile: "bob".to_string(),
                name: "report".to_string(),
                description: "Annual report".to_string(),
            },
        )
        .await
        .unwrap();

        let selection = DocumentLibrary::new(&profile).load_selection().unwrap();
        assert_eq!(selection.documents.len(), 1);
        assert_eq!(selection.descriptions["report"], "Annual report");
    }

    #[tokio::test]
    async fn test_select_unknown_document_fails() {
        let (config, _profile, _tmp) = setup();
        let result = handle_docs(
            &config,
            DocsCommand::Select {
                profile: "bob".to_string(),
                names: vec!["ghost".to_string()],
            },
        )
        .await;
        assert_error_contains(result, "Document not found: ghost");
    }

    #[tokio::test]
    async fn test_empty_select_clears() {
        let (config, profile, _tmp) = setup();
        std::fs::write(profile.data_dir().join("report.txt"), "Revenue").unwrap();
        let library = DocumentLibrary::new(&profile);
        library.select(&["report".to_string()]).unwrap();

        handle_docs(
            &config,
            DocsCommand::Select {
                profile: "bob".to_string(),
                names: Vec::new(),
            },
        )
        .await
        .unwrap();
        assert!(library.selected_names().unwrap().is_empty());
    }
}
