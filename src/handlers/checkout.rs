use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::Plan;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan: String,
    /// Pre-fills the Stripe checkout form when supplied.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// POST /checkout — create a Stripe Checkout session for a plan and hand the
/// client the hosted payment URL.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    // Plan validation happens before any provider call.
    let plan: Plan = request
        .plan
        .parse()
        .map_err(|_| AppError::BadRequest(msg::INVALID_PLAN.into()))?;

    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::Internal(msg::STRIPE_NOT_CONFIGURED.into()))?;

    let price_id = state.prices.price_for(stripe, plan).await?;

    let success_url = format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", state.app_url);
    let cancel_url = format!("{}/?cancelled=true", state.app_url);

    let session = stripe
        .create_checkout_session(
            plan,
            &price_id,
            request.email.as_deref(),
            &success_url,
            &cancel_url,
        )
        .await?;

    let url = session
        .url
        .ok_or_else(|| AppError::Provider("Checkout session has no redirect URL".into()))?;

    tracing::info!("Checkout session created: {} ({})", session.id, plan);

    Ok(Json(CheckoutResponse {
        url,
        session_id: session.id,
    }))
}
