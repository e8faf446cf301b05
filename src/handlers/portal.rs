use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PortalRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}

/// POST /portal — create a Stripe billing portal session so a subscriber
/// can manage or cancel their subscription.
pub async fn create_portal(
    State(state): State<AppState>,
    Json(request): Json<PortalRequest>,
) -> Result<Json<PortalResponse>> {
    let record = state.store.get(&request.email)?;
    let customer_id = record
        .and_then(|r| r.customer_id)
        .ok_or_else(|| AppError::NotFound(msg::NO_SUBSCRIPTION_FOR_EMAIL.into()))?;

    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::Internal(msg::STRIPE_NOT_CONFIGURED.into()))?;

    let return_url = format!("{}/app", state.app_url);
    let url = stripe.create_portal_session(&customer_id, &return_url).await?;

    Ok(Json(PortalResponse { url }))
}
