use super::{Classifier, RawClassification};
use crate::error::{PlantGuardError, Result};
use async_trait::async_trait;

/// Stand-in installed when no model could be loaded at startup
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableClassifier;

#[async_trait]
impl Classifier for UnavailableClassifier {
    async fn classify(&self, _image: &[u8], _content_type: Option<&str>) -> Result<RawClassification> {
        Err(PlantGuardError::inference(None, "model not loaded on server").into())
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
