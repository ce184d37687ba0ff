//! Chatfolio - profile-based LLM chat client
//!
#![doc = "Chatfolio - profile-based LLM chat client"]
#![doc = "Main entry point for the Chatfolio application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatfolio::cli::{Cli, Commands};
use chatfolio::commands;
use chatfolio::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;
    tracing::debug!("Profiles root: {}", config.profiles_dir.display());

    // Execute command
    match cli.command {
        Commands::Chat {
            profile,
            session,
            new,
        } => {
            if let Some(s) = &session {
                tracing::debug!("Resuming session: {}", s);
            }
            if new {
                tracing::debug!("Starting a fresh session");
            }

            // Moves `config` into the handler (match arms are exclusive)
            commands::chat::run_chat(config, profile, session, new).await?;
            Ok(())
        }
        Commands::Profile { command } => {
            commands::profile::handle_profile(&config, command)?;
            Ok(())
        }
        Commands::History { command } => {
            commands::history::handle_history(&config, command)?;
            Ok(())
        }
        Commands::Docs { command } => {
            commands::docs::handle_docs(&config, command).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` raises the crate's level
/// to debug. Logs go to stderr so they never interleave with replies.
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "chatfolio=debug"
    } else {
        "chatfolio=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
