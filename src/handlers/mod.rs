mod access;
mod checkout;
mod generate;
mod portal;
mod verify;
mod webhook;

pub use access::*;
pub use checkout::*;
pub use generate::*;
pub use portal::*;
pub use verify::*;
pub use webhook::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Public API routes (rate limiting is layered on in main, webhook excluded).
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/checkout", post(create_checkout))
        .route("/verify", post(verify_session))
        .route("/check-access", post(check_access))
        .route("/portal", post(create_portal))
        .route("/generate", post(generate_page))
}

/// Webhook route, kept separate: it consumes the raw body for signature
/// verification and must not sit behind the client rate limiter.
pub fn webhook_router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}
