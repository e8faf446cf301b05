use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::{License, Plan};
use crate::payments::CheckoutSession;
use crate::state::AppState;
use crate::store::LicenseStore;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub email: String,
    pub plan: Plan,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// Build the license record a confirmed session entitles its buyer to.
///
/// Email comes from the checkout form (fallback: the expanded customer
/// record), plan from session metadata (default monthly), and the
/// subscription id is None for one-time payments.
pub fn license_from_session(session: &CheckoutSession, now: i64) -> Result<License> {
    let email = session
        .customer_email()
        .ok_or_else(|| AppError::Provider(msg::SESSION_MISSING_EMAIL.into()))?;

    Ok(License {
        email,
        plan: session.plan(),
        active: true,
        customer_id: session.customer.as_ref().map(|c| c.id().to_string()),
        subscription_id: session.subscription.as_ref().map(|s| s.id().to_string()),
        activated_at: now,
    })
}

/// Grant entitlement for a confirmed session: upsert the license record and
/// issue an access token. Re-applying the same session converges to the
/// same record.
pub fn grant_access(
    store: &dyn LicenseStore,
    tokens: &crate::token::TokenIssuer,
    session: &CheckoutSession,
) -> Result<VerifyResponse> {
    let now = chrono::Utc::now();
    let license = license_from_session(session, now.timestamp())?;
    store.upsert(&license)?;

    tracing::info!("Access granted: {} ({})", license.email, license.plan);

    Ok(VerifyResponse {
        success: true,
        access_token: tokens.issue(&license.email, now.timestamp_millis()),
        email: license.email,
        plan: license.plan,
    })
}

/// POST /verify — called after the Stripe redirect to confirm payment and
/// issue access. An unconfirmed session is a 402 and mutates nothing.
pub async fn verify_session(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::Internal(msg::STRIPE_NOT_CONFIGURED.into()))?;

    let session = stripe.retrieve_checkout_session(&request.session_id).await?;

    if !session.is_confirmed() {
        return Err(AppError::PaymentRequired(msg::PAYMENT_NOT_COMPLETED.into()));
    }

    let response = grant_access(state.store.as_ref(), &state.tokens, &session)?;
    Ok(Json(response))
}
