//! Confidant - terminal client for conversational companions
//!
#![doc = "Confidant - terminal client for conversational companions"]
#![doc = "Main entry point for the Confidant CLI."]

use std::time::Duration;

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confidant::cli::{Cli, Commands};
use confidant::commands;
use confidant::config::Config;
use confidant::identity::SessionIdentity;

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

    // Execute command
    match cli.command {
        Commands::Companions { command } => {
            tracing::info!("Starting companion catalog command");
            let api = commands::build_api(&config)?;
            commands::companions::handle_companions(api.as_ref(), command).await?;
            Ok(())
        }
        Commands::Chat { companion } => {
            tracing::info!("Starting interactive chat with {}", companion);
            let api = commands::build_api(&config)?;
            let identity = SessionIdentity::from_config(&config.identity);
            commands::chat::run_chat(&config, api, &identity, &companion).await?;
            Ok(())
        }
        Commands::History { companion, json } => {
            tracing::info!("Starting history command");
            let api = commands::build_api(&config)?;
            let identity = SessionIdentity::from_config(&config.identity);
            commands::history::show_history(api, &identity, &companion, json).await?;
            Ok(())
        }
        Commands::Health { watch } => {
            let api = commands::build_api(&config)?;
            commands::health::check_health(
                api,
                &config.api.base_url,
                Duration::from_secs(config.health.interval_seconds),
                watch,
            )
            .await?;
            Ok(())
        }
        Commands::Identity { command } => {
            let identity = SessionIdentity::from_config(&config.identity);
            commands::identity::handle_identity(&identity, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "confidant=debug" } else { "confidant=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
