//! Command-line interface definition for PlantGuard
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to run the backend, classify a leaf photo, and manage
//! the signed-in user's history and profile.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PlantGuard - plant leaf disease prediction
///
/// Runs the prediction backend or talks to one: upload a leaf photo, see
/// the predicted disease with treatment advice, and keep a history of past
/// predictions when signed in.
#[derive(Parser, Debug, Clone)]
#[command(name = "plantguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Backend base URL (overrides client.base_url)
    #[arg(long, env = "PLANTGUARD_API_URL")]
    pub api_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "PLANTGUARD_JSON_LOGS")]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for PlantGuard
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the prediction backend
    Serve {
        /// Interface to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Classify a leaf photo
    Predict {
        /// Image file to upload
        image: PathBuf,

        /// Do not save the result to history even when signed in
        #[arg(long)]
        no_save: bool,

        /// Print the normalized result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show prediction history for the signed-in user
    History {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an account and store its session token
    Signup {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "PLANTGUARD_PASSWORD")]
        password: String,
    },

    /// Sign in and store the session token
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "PLANTGUARD_PASSWORD")]
        password: String,
    },

    /// Forget the stored session token
    Logout,

    /// Show or edit the signed-in user's profile
    Profile {
        /// Profile subcommand
        #[command(subcommand)]
        command: ProfileCommand,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Show the profile
    Show,

    /// Update profile fields; omitted fields are left unchanged
    Update {
        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Location
        #[arg(long)]
        location: Option<String>,

        /// Short biography
        #[arg(long)]
        bio: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["plantguard", "serve"]).unwrap();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        if let Commands::Serve { host, port } = cli.command {
            assert_eq!(host, None);
            assert_eq!(port, None);
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_cli_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["plantguard", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve {
                port: Some(8080),
                ..
            }
        ));
    }

    #[test]
    fn test_cli_parse_predict() {
        let cli = Cli::try_parse_from(["plantguard", "predict", "leaf.jpg", "--no-save"]).unwrap();
        if let Commands::Predict {
            image,
            no_save,
            json,
        } = cli.command
        {
            assert_eq!(image, PathBuf::from("leaf.jpg"));
            assert!(no_save);
            assert!(!json);
        } else {
            panic!("Expected Predict command");
        }
    }

    #[test]
    fn test_cli_predict_requires_image() {
        assert!(Cli::try_parse_from(["plantguard", "predict"]).is_err());
    }

    #[test]
    fn test_cli_parse_login() {
        let cli = Cli::try_parse_from([
            "plantguard",
            "login",
            "--email",
            "grower@example.com",
            "--password",
            "s3cret",
        ])
        .unwrap();
        if let Commands::Login { email, password } = cli.command {
            assert_eq!(email, "grower@example.com");
            assert_eq!(password, "s3cret");
        } else {
            panic!("Expected Login command");
        }
    }

    #[test]
    fn test_cli_parse_profile_update() {
        let cli = Cli::try_parse_from([
            "plantguard",
            "profile",
            "update",
            "--location",
            "Pune",
        ])
        .unwrap();
        if let Commands::Profile {
            command:
                ProfileCommand::Update {
                    name,
                    location,
                    bio,
                },
        } = cli.command
        {
            assert_eq!(name, None);
            assert_eq!(location, Some("Pune".to_string()));
            assert_eq!(bio, None);
        } else {
            panic!("Expected Profile Update command");
        }
    }

    #[test]
    fn test_cli_global_api_url() {
        let cli = Cli::try_parse_from([
            "plantguard",
            "--api-url",
            "http://10.0.0.5:5000",
            "history",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.api_url, Some("http://10.0.0.5:5000".to_string()));
        assert!(matches!(cli.command, Commands::History { json: true }));
    }
}
