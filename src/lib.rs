//! PlantGuard - plant leaf disease prediction library
//!
//! This library provides the prediction backend and its CLI client: image
//! classification behind a pluggable classifier, treatment advice, accounts
//! with bearer sessions, and per-user prediction history.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `classifier`: Classifier abstraction and implementations (remote, tensor)
//! - `prediction`: Prediction handler, treatment catalog and view model
//! - `history`: History records and the HTTP history recorder
//! - `storage`: SQLite persistence for users, sessions and history
//! - `server`: axum HTTP surface
//! - `client`: HTTP client used by the CLI
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use plantguard::prediction::normalize;
//! use serde_json::json;
//!
//! let view = normalize(&json!({"disease_label": "Tomato___Late_blight", "confidence": 0.87}));
//! assert_eq!(view.display_label, "Tomato - Late blight");
//! ```

pub mod auth;
pub mod classifier;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod prediction;
pub mod server;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use classifier::Classifier;
pub use config::Config;
pub use error::{PlantGuardError, Result};
pub use history::{HistoryEntry, HistoryEntryInput, HistoryRecorder};
pub use prediction::{PredictionHandler, PredictionResult, PredictionViewModel};
