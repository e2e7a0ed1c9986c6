//! History recorder tests against a `wiremock` history store
//!
//! Each test mounts the response shape one deployment of the store is known
//! to return and checks the recorder reconciles it.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plantguard::error::is_auth_error;
use plantguard::history::{record_best_effort, HistoryEntryInput, HistoryRecorder, SaveOutcome};

fn recorder(server: &MockServer) -> HistoryRecorder {
    HistoryRecorder::new(&server.uri(), 5).expect("recorder")
}

#[tokio::test]
async fn test_list_accepts_entries_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                {"id": 2, "disease_label": "Tomato___Late_blight", "confidence": "0.87"},
                {"id": 1, "label": "Apple___healthy", "confidence": 0.5}
            ]
        })))
        .mount(&server)
        .await;

    let entries = recorder(&server).list(Some("tok")).await.expect("list");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id.as_deref(), Some("2"));
    assert_eq!(entries[0].label.as_deref(), Some("Tomato___Late_blight"));
    assert_eq!(entries[0].confidence, 0.87);
    assert_eq!(entries[1].label.as_deref(), Some("Apple___healthy"));
}

#[tokio::test]
async fn test_list_accepts_history_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "history": [{"id": "a1", "label": "Corn___Common_rust"}]
        })))
        .mount(&server)
        .await;

    let entries = recorder(&server).list(Some("tok")).await.expect("list");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id.as_deref(), Some("a1"));
    assert_eq!(entries[0].confidence, 0.0);
}

#[tokio::test]
async fn test_list_accepts_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "label": "Grape___Black_rot", "created_at": "2026-03-01T09:30:00Z"}
        ])))
        .mount(&server)
        .await;

    let entries = recorder(&server).list(Some("tok")).await.expect("list");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].created_at.as_deref(), Some("2026-03-01T09:30:00Z"));
}

#[tokio::test]
async fn test_list_empty_object_is_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let entries = recorder(&server).list(Some("tok")).await.expect("list");
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_no_token_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let input = HistoryEntryInput::from_raw(&json!({"label": "Apple___healthy", "confidence": 0.9}));
    let outcome = record_best_effort(&recorder(&server), &input, None).await;
    assert_eq!(outcome, SaveOutcome::Skipped);

    let err = recorder(&server).list(None).await.unwrap_err();
    assert!(is_auth_error(&err));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_save_sends_canonical_label_and_unwraps_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/history"))
        .and(header("authorization", "Bearer tok"))
        .and(body_partial_json(json!({"label": "Tomato___Late_blight", "confidence": 0.87})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "entry": {"id": 12, "user_id": 3, "label": "Tomato___Late_blight", "confidence": 0.87}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let input = HistoryEntryInput::from_raw(&json!({
        "disease_label": "Tomato___Late_blight",
        "confidence": 0.87
    }));
    let entry = recorder(&server).save(&input, Some("tok")).await.expect("save");
    assert_eq!(entry.id.as_deref(), Some("12"));
    assert_eq!(entry.user_id.as_deref(), Some("3"));
    assert_eq!(entry.label.as_deref(), Some("Tomato___Late_blight"));
}

#[tokio::test]
async fn test_rejected_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid or expired token"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/history"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid or expired token"})),
        )
        .mount(&server)
        .await;

    let err = recorder(&server).list(Some("stale")).await.unwrap_err();
    assert!(is_auth_error(&err));

    let input = HistoryEntryInput::from_raw(&json!({"label": "Apple___healthy"}));
    let outcome = record_best_effort(&recorder(&server), &input, Some("stale")).await;
    assert_eq!(
        outcome,
        SaveOutcome::Unauthorized("Invalid or expired token".to_string())
    );
}

#[tokio::test]
async fn test_store_failure_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
        .mount(&server)
        .await;

    let input = HistoryEntryInput::from_raw(&json!({"label": "Apple___healthy"}));
    let outcome = record_best_effort(&recorder(&server), &input, Some("tok")).await;
    match outcome {
        SaveOutcome::Failed(message) => assert!(message.contains("database locked")),
        other => panic!("expected Failed, got {:?}", other),
    }
}
