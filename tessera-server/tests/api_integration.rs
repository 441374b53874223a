//! API integration tests for tessera-server.
//!
//! These tests drive the full registration and authentication flows through
//! the REST endpoints, using the deterministic mock provider to play the
//! role of the hardware token.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use tessera_core::{MockCrypto, RegistrationInfo};
use tessera_server::{create_router, AppState};

const TEST_APP_ID: &str = "https://testserver";

/// Build the test router with in-memory storage and the mock provider.
fn create_test_app() -> Router {
    create_router(AppState::in_memory(
        Arc::new(MockCrypto::default()),
        TEST_APP_ID,
    ))
}

/// The token-side provider, sharing the mock's default seed so its
/// signatures verify against the server.
fn token() -> MockCrypto {
    MockCrypto::default()
}

async fn send_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    // Axum's extractor rejections carry plain-text bodies; surface those as
    // Null rather than panicking before the test's assertions run.
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Register a device end to end, returning its id, key handle, and challenge
/// app id for later assertions.
async fn register_device(app: &Router) -> (String, String) {
    let (status, start) = send_json(app, "/devices/register/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let device_id = start["device_id"].as_str().unwrap().to_string();
    let challenge = start["challenge"].clone();

    let (status, finish) = send_json(
        app,
        "/devices/register/finish",
        json!({
            "device_id": device_id,
            "token": token().sign_registration(&challenge),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "registration failed: {finish}");
    let key_handle = finish["key_handle"].as_str().unwrap().to_string();
    assert!(!key_handle.is_empty());

    (device_id, key_handle)
}

fn registration_info(key_handle: &str) -> RegistrationInfo {
    RegistrationInfo {
        key_handle: key_handle.to_string(),
        public_key: String::new(),
        app_id: TEST_APP_ID.to_string(),
    }
}

/// Run one authentication round, returning the finish response body.
async fn authenticate(app: &Router, device_id: &str, key_handle: &str, counter: u32) -> Value {
    let (status, start) = send_json(
        app,
        "/devices/authenticate/start",
        json!({ "device_id": device_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "authenticate/start failed: {start}");

    let assertion =
        token().sign_assertion(&registration_info(key_handle), &start["challenge"], counter, true);

    let (status, finish) = send_json(
        app,
        "/devices/authenticate/finish",
        json!({ "device_id": device_id, "token": assertion }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "authenticate/finish failed: {finish}");
    finish
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "tessera-server");
    assert_eq!(body["persistent_storage"], false);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let app = create_test_app();
    let (status, body) = get_json(&app, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_start_issues_challenge() {
    let app = create_test_app();
    let (status, body) = send_json(&app, "/devices/register/start", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["device_id"].is_string());
    assert_eq!(body["prompt"], "Activate your U2F device");
    assert_eq!(body["challenge"]["appId"], TEST_APP_ID);
    assert!(body["challenge"]["challenge"].is_string());
}

#[tokio::test]
async fn test_register_full_flow() {
    let app = create_test_app();
    let (device_id, key_handle) = register_device(&app).await;

    assert!(!device_id.is_empty());
    assert!(!key_handle.is_empty());
}

#[tokio::test]
async fn test_register_finish_reports_registration_time() {
    let app = create_test_app();
    let (status, start) = send_json(&app, "/devices/register/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, finish) = send_json(
        &app,
        "/devices/register/finish",
        json!({
            "device_id": start["device_id"],
            "token": token().sign_registration(&start["challenge"]),
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(finish["registered_at"].is_string());
}

#[tokio::test]
async fn test_register_finish_unknown_device_is_404() {
    let app = create_test_app();
    let (status, body) = send_json(
        &app,
        "/devices/register/finish",
        json!({
            "device_id": "00000000-0000-0000-0000-000000000000",
            "token": "{}",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_register_finish_missing_fields_is_400() {
    let app = create_test_app();
    let (status, start) = send_json(&app, "/devices/register/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "/devices/register/finish",
        json!({ "device_id": start["device_id"], "token": "{}" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_FIELDS");
    // All four absent fields are reported at once.
    let message = body["error"].as_str().unwrap();
    for field in ["appId", "challenge", "clientData", "registrationData"] {
        assert!(message.contains(field), "missing {field} in: {message}");
    }
}

#[tokio::test]
async fn test_register_finish_garbage_token_is_400() {
    let app = create_test_app();
    let (status, start) = send_json(&app, "/devices/register/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "/devices/register/finish",
        json!({ "device_id": start["device_id"], "token": "not json at all" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_RESPONSE");
}

#[tokio::test]
async fn test_register_finish_twice_is_409() {
    let app = create_test_app();
    let (status, start) = send_json(&app, "/devices/register/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let tok = token().sign_registration(&start["challenge"]);

    let (status, _) = send_json(
        &app,
        "/devices/register/finish",
        json!({ "device_id": start["device_id"], "token": tok }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "/devices/register/finish",
        json!({ "device_id": start["device_id"], "token": tok }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_REGISTERED");
}

#[tokio::test]
async fn test_failed_registration_keeps_challenge() {
    let app = create_test_app();
    let (status, start) = send_json(&app, "/devices/register/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // A structurally valid token with a bad signature is rejected...
    let bad = json!({
        "appId": TEST_APP_ID,
        "challenge": start["challenge"]["challenge"],
        "clientData": "xxxx",
        "registrationData": "yyyy",
    })
    .to_string();
    let (status, body) = send_json(
        &app,
        "/devices/register/finish",
        json!({ "device_id": start["device_id"], "token": bad }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TOKEN");

    // ...but the challenge survives and a correct retry succeeds.
    let (status, _) = send_json(
        &app,
        "/devices/register/finish",
        json!({
            "device_id": start["device_id"],
            "token": token().sign_registration(&start["challenge"]),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_authenticate_full_flow() {
    let app = create_test_app();
    let (device_id, key_handle) = register_device(&app).await;

    let finish = authenticate(&app, &device_id, &key_handle, 1).await;
    assert_eq!(finish["verified"], true);
    assert_eq!(finish["counter"], 1);
}

#[tokio::test]
async fn test_counter_advances_across_authentications() {
    let app = create_test_app();
    let (device_id, key_handle) = register_device(&app).await;

    let first = authenticate(&app, &device_id, &key_handle, 5).await;
    assert_eq!(first["verified"], true);
    assert_eq!(first["counter"], 5);

    let second = authenticate(&app, &device_id, &key_handle, 6).await;
    assert_eq!(second["verified"], true);
    assert_eq!(second["counter"], 6);
}

#[tokio::test]
async fn test_replayed_counter_is_rejected_without_error() {
    let app = create_test_app();
    let (device_id, key_handle) = register_device(&app).await;

    let first = authenticate(&app, &device_id, &key_handle, 5).await;
    assert_eq!(first["verified"], true);

    // A cloned device replaying the last counter gets a clean "not verified",
    // indistinguishable from a bad signature.
    let replay = authenticate(&app, &device_id, &key_handle, 5).await;
    assert_eq!(replay["verified"], false);
    assert_eq!(replay["counter"], 5, "counter must not move on replay");
}

#[tokio::test]
async fn test_bad_signature_is_verified_false() {
    let app = create_test_app();
    let (device_id, key_handle) = register_device(&app).await;

    let (status, start) = send_json(
        &app,
        "/devices/authenticate/start",
        json!({ "device_id": device_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Sign with a different seed: structure is valid, signature is not.
    let forged = MockCrypto::new(99).sign_assertion(
        &registration_info(&key_handle),
        &start["challenge"],
        1,
        true,
    );
    let (status, body) = send_json(
        &app,
        "/devices/authenticate/finish",
        json!({ "device_id": device_id, "token": forged }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], false);
}

#[tokio::test]
async fn test_authenticate_start_unregistered_device_is_409() {
    let app = create_test_app();
    let (status, start) = send_json(&app, "/devices/register/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "/devices/authenticate/start",
        json!({ "device_id": start["device_id"] }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_REGISTERED");
}

#[tokio::test]
async fn test_authenticate_finish_without_challenge_is_409() {
    let app = create_test_app();
    let (device_id, key_handle) = register_device(&app).await;

    let finish = authenticate(&app, &device_id, &key_handle, 1).await;
    assert_eq!(finish["verified"], true);

    // The challenge was consumed by the successful attempt.
    let (status, body) = send_json(
        &app,
        "/devices/authenticate/finish",
        json!({ "device_id": device_id, "token": "{}" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "MISSING_CHALLENGE");
}

#[tokio::test]
async fn test_authenticate_unknown_device_is_404() {
    let app = create_test_app();
    let (status, body) = send_json(
        &app,
        "/devices/authenticate/start",
        json!({ "device_id": "11111111-2222-3333-4444-555555555555" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_device_id_is_client_error() {
    let app = create_test_app();
    let (status, _) = send_json(
        &app,
        "/devices/authenticate/start",
        json!({ "device_id": "not-a-uuid" }),
    )
    .await;

    // Axum's Json extractor rejects the body before the handler runs.
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// OpenAPI Tests
// ============================================================================

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let app = create_test_app();
    let (status, body) = get_json(&app, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Tessera - U2F Device API");
    assert!(body["paths"]["/devices/register/start"].is_object());
    assert!(body["paths"]["/devices/authenticate/finish"].is_object());
}
