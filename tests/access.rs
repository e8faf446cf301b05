//! Tests for the POST /check-access endpoint.

mod common;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::*;
use serde_json::json;

#[tokio::test]
async fn active_email_has_access() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert(&lifetime_license("user@example.com", "cus_1"))
        .unwrap();
    let state = test_state_with(store, None);

    let response = post_json(
        app(state),
        "/check-access",
        json!({"email": "User@Example.com"}),
    )
    .await;

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access"], true);
    assert_eq!(body["plan"], "lifetime");
    assert_eq!(body["email"], "user@example.com");
}

#[tokio::test]
async fn inactive_record_is_denied() {
    let store = Arc::new(MemoryStore::new());
    let mut record = monthly_license("user@example.com", "cus_1");
    record.active = false;
    store.upsert(&record).unwrap();
    let state = test_state_with(store, None);

    let response = post_json(
        app(state),
        "/check-access",
        json!({"email": "user@example.com"}),
    )
    .await;

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access"], false);
    assert!(body.get("plan").is_none());
}

#[tokio::test]
async fn unknown_email_is_a_normal_denial_not_an_error() {
    let state = test_state();

    let response = post_json(
        app(state),
        "/check-access",
        json!({"email": "nobody@example.com"}),
    )
    .await;

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert_eq!(body_json(response).await["access"], false);
}

#[tokio::test]
async fn token_resolves_to_email_before_first_colon() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert(&monthly_license("user@x.com", "cus_1"))
        .unwrap();
    let state = test_state_with(store, None);

    let token = BASE64.encode("user@x.com:1700000000000");
    let response = post_json(app(state), "/check-access", json!({"accessToken": token})).await;

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access"], true);
    assert_eq!(body["email"], "user@x.com");
}

#[tokio::test]
async fn explicit_email_wins_over_token() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert(&monthly_license("direct@example.com", "cus_1"))
        .unwrap();
    let state = test_state_with(store, None);

    let token = BASE64.encode("other@example.com:1700000000000");
    let response = post_json(
        app(state),
        "/check-access",
        json!({"email": "direct@example.com", "accessToken": token}),
    )
    .await;

    let body = body_json(response).await;
    assert_eq!(body["email"], "direct@example.com");
}

#[tokio::test]
async fn missing_email_and_token_is_a_client_error() {
    let state = test_state();

    let response = post_json(app(state), "/check-access", json!({})).await;

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn undecodable_token_alone_is_a_client_error() {
    let state = test_state();

    let response = post_json(
        app(state),
        "/check-access",
        json!({"accessToken": "!!not-base64!!"}),
    )
    .await;

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}
