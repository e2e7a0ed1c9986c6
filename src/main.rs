//! PlantGuard - plant leaf disease prediction
//!
#![doc = "Main entry point for the PlantGuard backend and CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use plantguard::cli::{Cli, Commands, ProfileCommand};
use plantguard::commands;
use plantguard::config::Config;
use plantguard::storage::ProfileUpdate;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting backend");
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Predict {
            image,
            no_save,
            json,
        } => {
            tracing::info!("Classifying {}", image.display());
            commands::predict::run_predict(config, image, no_save, json).await?;
            Ok(())
        }
        Commands::History { json } => {
            commands::history::handle_history(config, json).await?;
            Ok(())
        }
        Commands::Signup { email, password } => {
            commands::auth::signup(config, email, password).await?;
            Ok(())
        }
        Commands::Login { email, password } => {
            commands::auth::login(config, email, password).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::auth::logout(config).await?;
            Ok(())
        }
        Commands::Profile { command } => {
            match command {
                ProfileCommand::Show => commands::profile::show(config).await?,
                ProfileCommand::Update {
                    name,
                    location,
                    bio,
                } => {
                    let update = ProfileUpdate {
                        name,
                        location,
                        bio,
                    };
                    commands::profile::update(config, update).await?
                }
            }
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so command output on stdout stays pipeable.
fn init_tracing(verbose: bool, json_logs: bool) {
    let default_filter = if verbose {
        "plantguard=debug"
    } else {
        "plantguard=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
