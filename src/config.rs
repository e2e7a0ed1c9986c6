//! Configuration management for PlantGuard
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PlantGuardError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for PlantGuard
///
/// Holds everything needed to run the backend (`serve`) and the client
/// commands (`predict`, `history`, `login`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Classifier adapter configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Persistent storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session token configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Client-side configuration (backend base URL)
    #[serde(default)]
    pub client: ClientConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body (bytes)
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Origins allowed to call the API from a browser
    #[serde(default = "default_frontend_origins")]
    pub frontend_origins: Vec<String>,

    /// Maximum number of history rows returned by `GET /history`
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_body_limit() -> usize {
    10_485_760 // 10 MB
}

fn default_frontend_origins() -> Vec<String> {
    vec![
        "http://localhost:8080".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_history_limit() -> usize {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            frontend_origins: default_frontend_origins(),
            history_limit: default_history_limit(),
        }
    }
}

/// Classifier adapter configuration
///
/// Specifies which classifier adapter to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Type of classifier to use ("remote" or "tensor")
    #[serde(rename = "type", default = "default_classifier_type")]
    pub classifier_type: String,

    /// Remote labelled-inference service settings
    #[serde(default)]
    pub remote: RemoteClassifierConfig,

    /// Tensor-serving endpoint settings
    #[serde(default)]
    pub tensor: TensorClassifierConfig,

    /// JSON file mapping labels to treatment advice
    #[serde(default)]
    pub treatments_path: Option<PathBuf>,
}

fn default_classifier_type() -> String {
    "remote".to_string()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            classifier_type: default_classifier_type(),
            remote: RemoteClassifierConfig::default(),
            tensor: TensorClassifierConfig::default(),
            treatments_path: None,
        }
    }
}

/// Remote classifier configuration
///
/// The remote service receives the raw upload and answers with a labelled
/// JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteClassifierConfig {
    /// Inference endpoint accepting a multipart `image` field
    #[serde(default = "default_remote_url")]
    pub url: String,

    /// Request timeout (seconds)
    #[serde(default = "default_inference_timeout")]
    pub timeout_seconds: u64,
}

fn default_remote_url() -> String {
    "http://localhost:8500/classify".to_string()
}

fn default_inference_timeout() -> u64 {
    60
}

impl Default for RemoteClassifierConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            timeout_seconds: default_inference_timeout(),
        }
    }
}

/// Tensor classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorClassifierConfig {
    /// Predict endpoint accepting `{"instances": [...]}`
    #[serde(default = "default_tensor_url")]
    pub url: String,

    /// JSON array of class names indexed by model output position
    #[serde(default)]
    pub class_names_path: Option<PathBuf>,

    /// Model input size as `[height, width]`
    #[serde(default = "default_target_size")]
    pub target_size: [u32; 2],

    /// Pixel preprocessing applied before inference
    #[serde(default)]
    pub preprocessing: Preprocessing,

    /// Request timeout (seconds)
    #[serde(default = "default_inference_timeout")]
    pub timeout_seconds: u64,
}

fn default_tensor_url() -> String {
    "http://localhost:8501/v1/models/plant_disease:predict".to_string()
}

fn default_target_size() -> [u32; 2] {
    [224, 224]
}

impl Default for TensorClassifierConfig {
    fn default() -> Self {
        Self {
            url: default_tensor_url(),
            class_names_path: None,
            target_size: default_target_size(),
            preprocessing: Preprocessing::default(),
            timeout_seconds: default_inference_timeout(),
        }
    }
}

/// Pixel preprocessing mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Preprocessing {
    /// ImageNet "caffe" mode: RGB to BGR, per-channel mean subtraction
    #[default]
    Imagenet,
    /// Scale each channel into `[0, 1]`
    Unit,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite database path; defaults to the platform data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of issued bearer tokens (hours)
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,

    /// Iteration count for new password hashes
    #[serde(default = "default_password_rounds")]
    pub password_rounds: u32,
}

fn default_token_ttl_hours() -> u64 {
    24
}

fn default_password_rounds() -> u32 {
    crate::auth::DEFAULT_PASSWORD_ROUNDS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: default_token_ttl_hours(),
            password_rounds: default_password_rounds(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout (seconds)
    #[serde(default = "default_client_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_client_timeout() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_client_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlantGuardError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PlantGuardError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(host) = std::env::var("PLANTGUARD_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("PLANTGUARD_PORT") {
            if let Ok(value) = port.parse() {
                self.server.port = value;
            } else {
                tracing::warn!("Invalid PLANTGUARD_PORT: {}", port);
            }
        }

        if let Ok(origins) = std::env::var("PLANTGUARD_FRONTEND_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            tracing::debug!(?origins, "Env override: PLANTGUARD_FRONTEND_ORIGINS");
            self.server.frontend_origins = origins;
        }

        if let Ok(classifier_type) = std::env::var("PLANTGUARD_CLASSIFIER") {
            self.classifier.classifier_type = classifier_type;
        }

        if let Ok(url) = std::env::var("PLANTGUARD_CLASSIFIER_URL") {
            // The URL override targets whichever adapter is selected.
            match self.classifier.classifier_type.as_str() {
                "tensor" => self.classifier.tensor.url = url,
                _ => self.classifier.remote.url = url,
            }
        }

        if let Ok(path) = std::env::var("PLANTGUARD_CLASS_NAMES_PATH") {
            self.classifier.tensor.class_names_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("PLANTGUARD_TREATMENTS_PATH") {
            self.classifier.treatments_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("PLANTGUARD_DATABASE_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Ok(ttl) = std::env::var("PLANTGUARD_TOKEN_TTL_HOURS") {
            if let Ok(value) = ttl.parse() {
                self.auth.token_ttl_hours = value;
            } else {
                tracing::warn!("Invalid PLANTGUARD_TOKEN_TTL_HOURS: {}", ttl);
            }
        }

        if let Ok(base_url) = std::env::var("PLANTGUARD_API_URL") {
            self.client.base_url = base_url;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(api_url) = &cli.api_url {
            self.client.base_url = api_url.clone();
        }

        if let crate::cli::Commands::Serve { host, port } = &cli.command {
            if let Some(host) = host {
                self.server.host = host.clone();
            }
            if let Some(port) = port {
                self.server.port = *port;
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.classifier.classifier_type.is_empty() {
            return Err(
                PlantGuardError::Config("Classifier type cannot be empty".to_string()).into(),
            );
        }

        let valid_classifiers = ["remote", "tensor"];
        if !valid_classifiers.contains(&self.classifier.classifier_type.as_str()) {
            return Err(PlantGuardError::Config(format!(
                "Invalid classifier type: {}. Must be one of: {}",
                self.classifier.classifier_type,
                valid_classifiers.join(", ")
            ))
            .into());
        }

        if self.server.port == 0 {
            return Err(
                PlantGuardError::Config("server.port must be greater than 0".to_string()).into(),
            );
        }

        if self.server.body_limit_bytes == 0 {
            return Err(PlantGuardError::Config(
                "server.body_limit_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        if self.server.history_limit == 0 {
            return Err(PlantGuardError::Config(
                "server.history_limit must be greater than 0".to_string(),
            )
            .into());
        }

        if self.auth.token_ttl_hours == 0 {
            return Err(PlantGuardError::Config(
                "auth.token_ttl_hours must be greater than 0".to_string(),
            )
            .into());
        }

        if !(1..=crate::auth::MAX_PASSWORD_ROUNDS).contains(&self.auth.password_rounds) {
            return Err(PlantGuardError::Config(format!(
                "auth.password_rounds must be between 1 and {}",
                crate::auth::MAX_PASSWORD_ROUNDS
            ))
            .into());
        }

        if self.classifier.tensor.target_size.contains(&0) {
            return Err(PlantGuardError::Config(
                "classifier.tensor.target_size must be non-zero".to_string(),
            )
            .into());
        }

        if self.client.base_url.trim().is_empty() {
            return Err(
                PlantGuardError::Config("client.base_url cannot be empty".to_string()).into(),
            );
        }

        url::Url::parse(&self.client.base_url).map_err(|e| {
            PlantGuardError::Config(format!(
                "client.base_url is not a valid URL ({}): {}",
                self.client.base_url, e
            ))
        })?;

        Ok(())
    }
}
