//! Stripe webhook reconciliation.
//!
//! Events resolve back to a license record through the Stripe customer id.
//! An event with no matching record is ignored (the purchase may have gone
//! through a different deployment), as are unrecognized event types. A
//! malformed or unverifiable payload fails the whole request so Stripe's
//! retry mechanism redelivers it.

use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde_json::json;

use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::{License, Plan};
use crate::payments::{CheckoutSession, StripeInvoice, StripeSubscription, StripeWebhookEvent};
use crate::state::AppState;
use crate::store::LicenseStore;

/// Apply one billing lifecycle event to the license store.
///
/// The license state machine: `active` toggles with subscription health;
/// `plan` never changes here. Lifetime records are never deactivated by
/// subscription deletion — a one-time payment outlives any subscription
/// object Stripe may tear down.
pub fn apply_event(store: &dyn LicenseStore, event: &StripeWebhookEvent) -> Result<()> {
    match event.event_type.as_str() {
        "invoice.payment_succeeded" => {
            let invoice: StripeInvoice = serde_json::from_value(event.data.object.clone())?;
            if let Some(record) = lookup_by_customer(store, invoice.customer.as_deref())? {
                store.set_active(&record.email, true)?;
                tracing::info!("Renewal OK: {}", record.email);
            }
        }

        // Deliberate no-op: Stripe retries the charge on its own schedule,
        // and a terminal outcome arrives as customer.subscription.updated
        // (past_due/canceled) or .deleted, which do deactivate.
        "invoice.payment_failed" => {
            let invoice: StripeInvoice = serde_json::from_value(event.data.object.clone())?;
            if let Some(record) = lookup_by_customer(store, invoice.customer.as_deref())? {
                tracing::warn!("Payment failed for: {}", record.email);
            }
        }

        "customer.subscription.deleted" => {
            let sub: StripeSubscription = serde_json::from_value(event.data.object.clone())?;
            if let Some(record) = lookup_by_customer(store, sub.customer.as_deref())? {
                match record.plan {
                    Plan::Monthly => {
                        store.set_active(&record.email, false)?;
                        tracing::info!("Subscription cancelled: {}", record.email);
                    }
                    // Lifetime buyers keep access even if a stray
                    // subscription object is deleted.
                    Plan::Lifetime => {}
                }
            }
        }

        "customer.subscription.updated" => {
            let sub: StripeSubscription = serde_json::from_value(event.data.object.clone())?;
            if let Some(record) = lookup_by_customer(store, sub.customer.as_deref())? {
                let active = matches!(sub.status.as_str(), "active" | "trialing");
                store.set_active(&record.email, active)?;
                tracing::info!("Subscription updated: {} -> {}", record.email, sub.status);
            }
        }

        // One-time payment completed out-of-band: grant lifetime access even
        // if the client never called /verify.
        "checkout.session.completed" => {
            let session: CheckoutSession = serde_json::from_value(event.data.object.clone())?;
            let one_time_paid =
                session.mode.as_deref() == Some("payment") && session.payment_status == "paid";
            if one_time_paid {
                if let Some(email) = session.customer_email() {
                    store.upsert(&License {
                        email: email.clone(),
                        plan: Plan::Lifetime,
                        active: true,
                        customer_id: session.customer.as_ref().map(|c| c.id().to_string()),
                        subscription_id: None,
                        activated_at: chrono::Utc::now().timestamp(),
                    })?;
                    tracing::info!("Lifetime access granted: {}", email);
                }
            }
        }

        // Unhandled event type: accept and ignore for forward compatibility.
        other => {
            tracing::debug!("Ignoring webhook event type: {}", other);
        }
    }

    Ok(())
}

fn lookup_by_customer(
    store: &dyn LicenseStore,
    customer_id: Option<&str>,
) -> Result<Option<License>> {
    match customer_id {
        Some(id) => store.get_by_customer_id(id),
        None => Ok(None),
    }
}

/// POST /webhook — raw body in, signature checked when a secret is
/// configured, then reconciled against the store.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let verify = state
        .stripe
        .as_ref()
        .filter(|s| s.has_webhook_secret());

    match verify {
        Some(stripe) => {
            let signature = headers
                .get("stripe-signature")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".into()))?;

            if !stripe.verify_webhook_signature(&body, signature)? {
                return Err(AppError::BadRequest(msg::SIGNATURE_MISMATCH.into()));
            }
        }
        // Explicitly weaker mode: without a secret the payload is trusted
        // as-is. main() logs a startup warning when this is the case.
        None => {}
    }

    let event: StripeWebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    tracing::debug!("Webhook: {}", event.event_type);
    apply_event(state.store.as_ref(), &event)?;

    Ok(Json(json!({ "received": true })))
}
