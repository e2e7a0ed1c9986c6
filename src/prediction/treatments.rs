//! Treatment catalog keyed by canonical class label

use crate::error::{PlantGuardError, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// Treatment advice looked up by the canonical class label
///
/// Loaded once at startup from a JSON object such as
/// `{"Tomato___Late_blight": [{"title": "...", "steps": "..."}]}`. Values
/// are kept as-is; [`super::fields::normalize_treatments`] shapes them for
/// display.
#[derive(Debug, Clone, Default)]
pub struct TreatmentCatalog {
    entries: Map<String, Value>,
}

impl TreatmentCatalog {
    /// An empty catalog
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from an in-memory map
    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Load a catalog from a JSON file
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or is not a
    /// JSON object.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PlantGuardError::Config(format!(
                "Failed to read treatments file {}: {}",
                path.display(),
                e
            ))
        })?;
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(entries)) => Ok(Self { entries }),
            Ok(_) => Err(PlantGuardError::Config(format!(
                "Treatments file {} must contain a JSON object",
                path.display()
            ))
            .into()),
            Err(e) => Err(PlantGuardError::Config(format!(
                "Failed to parse treatments file {}: {}",
                path.display(),
                e
            ))
            .into()),
        }
    }

    /// Load the configured catalog, falling back to an empty one
    ///
    /// Missing or broken catalogs only cost treatment advice, so they are
    /// logged rather than fatal.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            tracing::info!("No treatments file configured");
            return Self::empty();
        };

        if !path.exists() {
            tracing::warn!("No treatments file found at {}", path.display());
            return Self::empty();
        }

        match Self::load(path) {
            Ok(catalog) => {
                tracing::info!(count = catalog.len(), "Loaded treatments catalog");
                catalog
            }
            Err(e) => {
                tracing::warn!("Failed to load treatments catalog: {}", e);
                Self::empty()
            }
        }
    }

    /// Treatment value for a canonical label
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.entries.get(label).filter(|v| !v.is_null())
    }

    /// Number of labels with advice
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the catalog holds no advice
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
