//! Classifier adapters against a `wiremock` inference service

mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plantguard::classifier::{Classifier, RemoteClassifier, TensorClassifier};
use plantguard::config::{Preprocessing, RemoteClassifierConfig, TensorClassifierConfig};
use plantguard::error::{find_plantguard_error, PlantGuardError};

fn remote(server: &MockServer) -> RemoteClassifier {
    RemoteClassifier::new(RemoteClassifierConfig {
        url: format!("{}/classify", server.uri()),
        timeout_seconds: 5,
    })
    .expect("remote classifier")
}

#[tokio::test]
async fn test_remote_returns_raw_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "disease_label": "Tomato___Late_blight",
            "confidence": 0.87
        })))
        .expect(1)
        .mount(&server)
        .await;

    let raw = remote(&server)
        .classify(&common::tiny_png(), Some("image/png"))
        .await
        .expect("classify");
    assert_eq!(raw["disease_label"], "Tomato___Late_blight");
    assert_eq!(raw["confidence"], 0.87);
}

#[tokio::test]
async fn test_remote_error_status_carries_upstream_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "Model not loaded"})))
        .mount(&server)
        .await;

    let err = remote(&server)
        .classify(b"leaf", None)
        .await
        .unwrap_err();
    let pg = find_plantguard_error(&err).expect("plantguard error");
    assert!(matches!(
        pg,
        PlantGuardError::Inference { status: Some(503), message } if message == "Model not loaded"
    ));
    assert_eq!(pg.status_code(), 502);
}

#[tokio::test]
async fn test_remote_non_object_response_is_inference_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.1, 0.9])))
        .mount(&server)
        .await;

    let err = remote(&server).classify(b"leaf", None).await.unwrap_err();
    assert!(matches!(
        find_plantguard_error(&err),
        Some(PlantGuardError::Inference { status: None, .. })
    ));
}

#[tokio::test]
async fn test_tensor_applies_softmax_and_class_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models/plant:predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [[1.0, 3.0, 0.5]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let names_path = dir.path().join("class_names.json");
    std::fs::write(
        &names_path,
        r#"["Apple___healthy", "Tomato___Late_blight", "Corn___healthy"]"#,
    )
    .expect("write class names");

    let classifier = TensorClassifier::new(TensorClassifierConfig {
        url: format!("{}/v1/models/plant:predict", server.uri()),
        class_names_path: Some(names_path),
        target_size: [8, 8],
        preprocessing: Preprocessing::Unit,
        timeout_seconds: 5,
    })
    .expect("tensor classifier");

    let raw = classifier
        .classify(&common::tiny_png(), Some("image/png"))
        .await
        .expect("classify");
    assert_eq!(raw["label"], "Tomato___Late_blight");
    assert_eq!(raw["class_index"], 1);
    let confidence = raw["confidence"].as_f64().expect("confidence");
    assert!(confidence > 0.8 && confidence < 0.9, "got {}", confidence);

    let requests = server.received_requests().await.unwrap_or_default();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let instance = &body["instances"][0];
    assert_eq!(instance.as_array().map(Vec::len), Some(8));
    assert_eq!(instance[0].as_array().map(Vec::len), Some(8));
}

#[tokio::test]
async fn test_tensor_rejects_undecodable_image_before_calling_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": [[1.0]]})))
        .expect(0)
        .mount(&server)
        .await;

    let classifier = TensorClassifier::new(TensorClassifierConfig {
        url: format!("{}/predict", server.uri()),
        ..Default::default()
    })
    .expect("tensor classifier");

    let err = classifier.classify(b"not an image", None).await.unwrap_err();
    assert_eq!(
        find_plantguard_error(&err).map(PlantGuardError::status_code),
        Some(400)
    );
}
