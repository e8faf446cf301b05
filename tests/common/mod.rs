//! Test utilities and fixtures for PageForge integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tower::ServiceExt;

pub use pageforge::handlers;
pub use pageforge::models::{License, Plan};
pub use pageforge::payments::{PriceCache, StripeClient, StripeWebhookEvent};
pub use pageforge::state::AppState;
pub use pageforge::store::{init_db, LicenseStore, MemoryStore, SqliteStore};
pub use pageforge::token::TokenIssuer;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// In-memory SQLite store. Single pooled connection so every call sees the
/// same database.
pub fn sqlite_store() -> SqliteStore {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    init_db(&pool.get().unwrap()).expect("Failed to initialize schema");
    SqliteStore::new(pool)
}

/// AppState backed by an in-memory store, no Stripe configured.
pub fn test_state() -> AppState {
    test_state_with(Arc::new(MemoryStore::new()), None)
}

/// AppState with an explicit store and optional webhook secret. When a
/// secret is given, a (non-functional) Stripe client is configured so the
/// webhook route verifies signatures.
pub fn test_state_with(store: Arc<dyn LicenseStore>, webhook_secret: Option<&str>) -> AppState {
    let stripe =
        webhook_secret.map(|s| Arc::new(StripeClient::new("sk_test_xxx", Some(s))));

    AppState {
        store,
        stripe,
        prices: Arc::new(PriceCache::new(None, None)),
        tokens: Arc::new(TokenIssuer::Plain),
        generator: None,
        app_url: "http://localhost:3000".to_string(),
    }
}

/// Full router (API + webhook) without rate limiting.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::api_router())
        .merge(handlers::webhook_router())
        .with_state(state)
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("Response should be valid JSON")
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn monthly_license(email: &str, customer_id: &str) -> License {
    License {
        email: email.to_string(),
        plan: Plan::Monthly,
        active: true,
        customer_id: Some(customer_id.to_string()),
        subscription_id: Some("sub_test".to_string()),
        activated_at: now(),
    }
}

pub fn lifetime_license(email: &str, customer_id: &str) -> License {
    License {
        email: email.to_string(),
        plan: Plan::Lifetime,
        active: true,
        customer_id: Some(customer_id.to_string()),
        subscription_id: None,
        activated_at: now(),
    }
}

/// Compute a Stripe-style `t=...,v1=...` signature header for a payload.
pub fn stripe_signature_header(payload: &[u8], secret: &str) -> String {
    let timestamp = now().to_string();
    let sig = compute_stripe_signature(payload, secret, &timestamp);
    format!("t={},v1={}", timestamp, sig)
}

pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Parse a raw JSON value as a webhook event envelope.
pub fn event(value: serde_json::Value) -> StripeWebhookEvent {
    serde_json::from_value(value).expect("valid webhook event")
}
