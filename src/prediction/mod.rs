//! Prediction pipeline
//!
//! Server side, [`PredictionHandler`] turns an uploaded image into a
//! [`PredictionResult`]. Client side, [`normalize`] turns whatever the
//! backend answered into a [`PredictionViewModel`]. Both reconcile field
//! names through [`fields`].

pub mod fields;
pub mod handler;
pub mod treatments;
pub mod types;
pub mod view;

pub use handler::PredictionHandler;
pub use treatments::TreatmentCatalog;
pub use types::{PredictionResult, Treatment};
pub use view::{display_label, normalize, PredictionViewModel, UNKNOWN_LABEL};
