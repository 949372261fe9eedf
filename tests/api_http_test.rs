//! HTTP backend client integration tests
//!
//! Exercises `HttpCompanionApi` against a `wiremock` mock server: request
//! shapes, status-code mapping and payload decoding.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use confidant::api::{ChatRequest, CompanionInput, HttpCompanionApi, DEFAULT_AVATAR_PATH};
use confidant::{CompanionApi, ConfidantError, DeliveryState, Role};

use common::{api_for, companion_json, config_for, wire_message};

fn error_of(err: &anyhow::Error) -> &ConfidantError {
    err.downcast_ref::<ConfidantError>()
        .expect("error should be a ConfidantError")
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_companions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/companions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            companion_json("c1", "sophia", "Sophia"),
            companion_json("c2", "nova", "Nova"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let companions = api_for(&server).list_companions().await.unwrap();
    assert_eq!(companions.len(), 2);
    assert_eq!(companions[0].key(), "c1");
    assert_eq!(companions[1].slug, "nova");
}

#[tokio::test]
async fn test_get_companion_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/companions/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found"})))
        .mount(&server)
        .await;

    let err = api_for(&server).get_companion("ghost").await.unwrap_err();
    assert!(matches!(error_of(&err), ConfidantError::CompanionNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn test_create_companion_sends_admin_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/companions"))
        .and(header("authorization", "Bearer s3cret"))
        .and(body_json(json!({
            "name": "Nova",
            "slug": "nova",
            "short_bio": "Curious explorer.",
            "long_backstory": "",
            "traits": ["curious"],
            "avatar_path": DEFAULT_AVATAR_PATH,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(companion_json("c9", "nova", "Nova")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.api.admin_token = Some("s3cret".to_string());
    let api = HttpCompanionApi::from_config(&config).unwrap();

    let input = CompanionInput {
        name: "Nova".to_string(),
        slug: "nova".to_string(),
        short_bio: "Curious explorer.".to_string(),
        long_backstory: String::new(),
        traits: vec!["curious".to_string()],
        avatar_path: DEFAULT_AVATAR_PATH.to_string(),
    };
    let created = api.create_companion(&input).await.unwrap();
    assert_eq!(created.key(), "c9");
}

#[tokio::test]
async fn test_create_companion_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/companions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let input = CompanionInput {
        name: "Nova".to_string(),
        slug: "nova".to_string(),
        short_bio: "Curious explorer.".to_string(),
        long_backstory: String::new(),
        traits: Vec::new(),
        avatar_path: DEFAULT_AVATAR_PATH.to_string(),
    };
    let err = api_for(&server).create_companion(&input).await.unwrap_err();
    match error_of(&err) {
        ConfidantError::Api(message) => assert!(message.contains("401")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_update_companion_puts_to_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/companions/c1"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(companion_json("c1", "sophia", "Sophie")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.api.admin_token = Some("s3cret".to_string());
    let api = HttpCompanionApi::from_config(&config).unwrap();

    let input = CompanionInput {
        name: "Sophie".to_string(),
        slug: "sophia".to_string(),
        short_bio: "A gentle poet.".to_string(),
        long_backstory: String::new(),
        traits: Vec::new(),
        avatar_path: DEFAULT_AVATAR_PATH.to_string(),
    };
    let updated = api.update_companion("c1", &input).await.unwrap();
    assert_eq!(updated.name, "Sophie");
}

#[tokio::test]
async fn test_delete_companion() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/companions/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/companions/c2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = api_for(&server);
    api.delete_companion("c1").await.unwrap();
    let err = api.delete_companion("c2").await.unwrap_err();
    assert!(matches!(error_of(&err), ConfidantError::CompanionNotFound(_)));
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_load_thread_passes_session_and_decodes_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/c1"))
        .and(query_param("session_id", "guest_abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            wire_message("m1", "user", "Hello", "2025-03-01T10:00:00.123456"),
            wire_message("m2", "assistant", "Hi there!", "2025-03-01T10:00:02Z"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let messages = api_for(&server)
        .load_thread("c1", "guest_abc123")
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].delivery_state, Some(DeliveryState::Confirmed));
    assert_eq!(messages[1].role, Role::Companion);
    assert!(messages[0].timestamp < messages[1].timestamp);
}

#[tokio::test]
async fn test_load_thread_failure_is_thread_load_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/c1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = api_for(&server).load_thread("c1", "guest_1").await.unwrap_err();
    assert!(matches!(
        error_of(&err),
        ConfidantError::ThreadLoad { companion_id, .. } if companion_id == "c1"
    ));
}

#[tokio::test]
async fn test_send_message_posts_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "companion_id": "sophia",
            "message": "Hello",
            "session_id": "guest_abc123",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reply": "Hi there!",
            "thread": [
                wire_message("m1", "user", "Hello", "2025-03-01T10:00:00"),
                wire_message("m2", "assistant", "Hi there!", "2025-03-01T10:00:01"),
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = api_for(&server)
        .send_message(&ChatRequest {
            companion_id: "sophia".to_string(),
            message: "Hello".to_string(),
            session_id: "guest_abc123".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.reply.as_deref(), Some("Hi there!"));
    assert_eq!(response.thread.len(), 2);
}

#[tokio::test]
async fn test_send_message_failure_is_send_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .send_message(&ChatRequest {
            companion_id: "sophia".to_string(),
            message: "Hello".to_string(),
            session_id: "guest_1".to_string(),
        })
        .await
        .unwrap_err();
    match error_of(&err) {
        ConfidantError::Send(message) => assert!(message.contains("502")),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_probe_hits_api_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    api_for(&server).probe().await.unwrap();
}

#[tokio::test]
async fn test_probe_non_success_is_health_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = api_for(&server).probe().await.unwrap_err();
    assert!(matches!(error_of(&err), ConfidantError::HealthCheck(_)));
}

#[tokio::test]
async fn test_base_url_prefix_is_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/backend/api/companions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.api.base_url = format!("{}/backend", server.uri());
    let api = HttpCompanionApi::from_config(&config).unwrap();
    assert!(api.list_companions().await.unwrap().is_empty());
}
