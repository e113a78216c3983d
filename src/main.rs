//! Parlance - Moderated conversation sessions with response caching
//!
//! Main entry point for the Parlance CLI.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parlance::cli::{CacheCommand, Cli, Commands};
use parlance::commands;
use parlance::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse_args();

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path)?;
    config.validate()?;

    match cli.command {
        Commands::Chat {
            session,
            no_moderate,
        } => {
            tracing::info!("Starting chat command");
            if no_moderate {
                tracing::warn!("Moderation gate disabled for this session");
            }
            commands::chat::run_chat(config, session, no_moderate).await?;
            Ok(())
        }
        Commands::Cache { command } => {
            tracing::info!("Starting cache maintenance command");
            match command {
                CacheCommand::Investigate { contains, all_of } => {
                    commands::cache::investigate(&config, contains, all_of)?;
                    Ok(())
                }
                CacheCommand::Edit { input, output } => {
                    commands::cache::edit(&config, &input, &output)?;
                    Ok(())
                }
                CacheCommand::Delete { input } => {
                    commands::cache::delete(&config, &input)?;
                    Ok(())
                }
            }
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parlance=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
