use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use plantguard::classifier::{Classifier, RawClassification};
use plantguard::config::Config;
use plantguard::error::{PlantGuardError, Result};
use plantguard::prediction::{PredictionHandler, TreatmentCatalog};
use plantguard::server::{build_router, AppState};
use plantguard::storage::SqliteStorage;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("plantguard.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A small valid PNG
#[allow(dead_code)]
pub fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([40, 160, 60]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("failed to encode png");
    out.into_inner()
}

/// Classifier answering with a fixed raw result and counting calls
#[allow(dead_code)]
pub struct StubClassifier {
    response: Option<RawClassification>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubClassifier {
    pub fn answering(response: Value) -> Arc<Self> {
        let response = match response {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Arc::new(Self {
            response: Some(response),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            response: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, _image: &[u8], _content_type: Option<&str>) -> Result<RawClassification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Err(PlantGuardError::inference(Some(503), "model warming up").into()),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Application state over a temp database
#[allow(dead_code)]
pub fn test_state(classifier: Arc<dyn Classifier>, catalog: TreatmentCatalog) -> (AppState, TempDir) {
    let (storage, tmp) = create_temp_storage();
    let handler = PredictionHandler::new(classifier, catalog);
    let mut config = Config::default();
    config.auth.password_rounds = 1000;
    (AppState::new(handler, storage, config), tmp)
}

/// Serve the router on an ephemeral port; returns the base URL
#[allow(dead_code)]
pub async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, build_router(state))
            .await
            .expect("test server failed");
    });
    format!("http://{}", addr)
}
