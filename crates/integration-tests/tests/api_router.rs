//! In-process router tests.
//!
//! The router runs against a database that is down and with no session
//! layer, which is enough to check routing, auth guards, input rejection
//! and the fallback tiers. Nothing here needs external services.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use stowline_integration_tests::offline_app;

async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = offline_app().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn get(uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    send(Request::get(uri).body(Body::empty()).unwrap()).await
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn error_message(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["error"].as_str().unwrap().to_string()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_liveness_does_not_touch_the_database() {
    let (status, _, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_readiness_reports_database_down() {
    let (status, _, _) = get("/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// Auth guards
// ============================================================================

#[tokio::test]
async fn test_customer_routes_require_sign_in() {
    for uri in [
        "/api/users/me",
        "/api/appointments",
        "/api/storage-units/mine",
        "/api/notifications",
        "/api/notifications/unread-count",
        "/api/auth/session",
    ] {
        let (status, _, body) = get(uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(error_message(&body), "Unauthorized: Not signed in", "{uri}");
    }
}

#[tokio::test]
async fn test_admin_routes_require_sign_in() {
    for uri in [
        "/api/admin/appointments",
        "/api/admin/storage-units",
        "/api/admin/moving-partners",
        "/api/admin/drivers",
        "/api/admin/vehicles",
    ] {
        let (status, _, _) = get(uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_admin_writes_require_sign_in() {
    let (status, _, _) = send(json_request(
        "POST",
        "/api/admin/storage-units/1/cleaning",
        r#"{"photos": []}"#,
    ))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_guard_runs_before_body_validation() {
    // Bodies that would be 400s for a signed-in caller.
    for (method, uri, body) in [
        (
            "PATCH",
            "/api/admin/appointments/1/partner-contact",
            r#"{"contacted": "yes"}"#,
        ),
        (
            "PATCH",
            "/api/users/1/phone-number",
            r#"{"phoneNumber": "555-0100"}"#,
        ),
    ] {
        let (status, _, body) = send(json_request(method, uri, body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(error_message(&body), "Unauthorized: Not signed in", "{uri}");
    }
}

#[tokio::test]
async fn test_driver_routes_require_sign_in() {
    let (status, _, _) = get("/api/driver/appointments").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Input rejection
// ============================================================================

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let (status, _, body) = send(json_request("POST", "/api/auth/send-code", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert!(value["error"].is_string());
}

#[tokio::test]
async fn test_unknown_account_type_is_a_bad_request() {
    let (status, _, _) = send(json_request(
        "POST",
        "/api/auth/send-code",
        r#"{"contact": "4155550100", "accountType": "pirate"}"#,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_contact_is_rejected_before_any_lookup() {
    let (status, _, _) = send(json_request(
        "POST",
        "/api/auth/send-code",
        r#"{"contact": "555-0100", "accountType": "customer"}"#,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_phone_login_is_rejected() {
    let (status, _, _) = send(json_request(
        "POST",
        "/api/auth/send-code",
        r#"{"contact": "(415) 555-0100", "accountType": "admin"}"#,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (status, _, _) = get("/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Public endpoints
// ============================================================================

#[tokio::test]
async fn test_reviews_fall_back_when_every_source_is_down() {
    let (status, headers, body) = get("/api/reviews").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );

    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["source"], "fallback");
    let reviews = value["reviews"].as_array().unwrap();
    assert!(!reviews.is_empty());
    for review in reviews {
        let rating = review["rating"].as_i64().unwrap();
        assert!((1..=5).contains(&rating));
        assert!(review["authorName"].is_string());
    }
}

#[tokio::test]
async fn test_availability_needs_the_database() {
    let (status, _, body) = get("/api/storage-units/availability").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // Internal details never reach the client.
    assert_eq!(error_message(&body), "Internal server error");
}
