use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{msg, AppError, Result};
use crate::models::Plan;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API: &str = "https://api.stripe.com/v1";

/// Outbound call timeout. No retries here: a failed provider call surfaces
/// immediately to the caller.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A Stripe field that is either a bare id or, when expanded, a full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Object(T),
    Id(String),
}

impl<T> Expandable<T> {
    pub fn object(&self) -> Option<&T> {
        match self {
            Expandable::Object(obj) => Some(obj),
            Expandable::Id(_) => None,
        }
    }
}

impl Expandable<StripeCustomer> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Object(c) => &c.id,
            Expandable::Id(id) => id,
        }
    }
}

impl Expandable<StripeSubscription> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Object(s) => &s.id,
            Expandable::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    pub customer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionMetadata {
    pub plan: Option<String>,
}

/// Checkout session as returned by retrieve with
/// `expand[]=customer&expand[]=subscription`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    /// "payment" or "subscription"
    pub mode: Option<String>,
    pub payment_status: String,
    pub customer: Option<Expandable<StripeCustomer>>,
    pub customer_details: Option<CustomerDetails>,
    pub subscription: Option<Expandable<StripeSubscription>>,
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
}

impl CheckoutSession {
    /// Payment is confirmed when the session is paid outright, or its
    /// subscription is live (active or still in trial).
    pub fn is_confirmed(&self) -> bool {
        if self.payment_status == "paid" {
            return true;
        }
        self.subscription
            .as_ref()
            .and_then(|s| s.object())
            .map(|s| matches!(s.status.as_str(), "active" | "trialing"))
            .unwrap_or(false)
    }

    /// Email entered at checkout, falling back to the expanded customer
    /// record. Lower-cased.
    pub fn customer_email(&self) -> Option<String> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.clone())
            .or_else(|| {
                self.customer
                    .as_ref()
                    .and_then(|c| c.object())
                    .and_then(|c| c.email.clone())
            })
            .map(|e| e.to_lowercase())
    }

    /// Plan recorded in session metadata at checkout time. Sessions created
    /// before plan metadata existed default to monthly.
    pub fn plan(&self) -> Plan {
        self.metadata
            .as_ref()
            .and_then(|m| m.plan.as_deref())
            .and_then(|p| p.parse().ok())
            .unwrap_or(Plan::Monthly)
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub customer: Option<String>,
}

/// Generic webhook envelope; `data.object` is parsed per event type.
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct List<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct StripeProduct {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub id: String,
    pub unit_amount: Option<i64>,
    pub recurring: Option<PriceRecurring>,
}

#[derive(Debug, Deserialize)]
pub struct PriceRecurring {
    pub interval: String,
}

#[derive(Debug, Deserialize)]
struct PortalSession {
    url: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: &str, webhook_secret: Option<&str>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            secret_key: secret_key.to_string(),
            webhook_secret: webhook_secret.map(String::from),
        }
    }

    pub fn has_webhook_secret(&self) -> bool {
        self.webhook_secret.is_some()
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{}", STRIPE_API, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(stripe_error_message(&error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Stripe response: {}", e)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", STRIPE_API, path_and_query))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(stripe_error_message(&error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Stripe response: {}", e)))
    }

    /// Create a Checkout session for a plan at an already-resolved price.
    ///
    /// Monthly runs in `subscription` mode, lifetime in one-time `payment`
    /// mode. The plan lands in session metadata so verification and the
    /// `checkout.session.completed` webhook can recover it.
    pub async fn create_checkout_session(
        &self,
        plan: Plan,
        price_id: &str,
        customer_email: Option<&str>,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession> {
        let mut form = vec![
            ("mode", plan.checkout_mode()),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("metadata[plan]", plan.as_str()),
            ("allow_promotion_codes", "true"),
        ];
        if let Some(email) = customer_email {
            form.push(("customer_email", email));
        }

        self.post_form("/checkout/sessions", &form).await
    }

    /// Retrieve a session with customer and subscription expanded, so payment
    /// confirmation can inspect the subscription status directly.
    pub async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        self.get_json(&format!(
            "/checkout/sessions/{}?expand[]=customer&expand[]=subscription",
            session_id
        ))
        .await
    }

    pub async fn list_active_products(&self) -> Result<Vec<StripeProduct>> {
        let list: List<StripeProduct> = self.get_json("/products?active=true&limit=100").await?;
        Ok(list.data)
    }

    pub async fn create_product(&self, name: &str) -> Result<StripeProduct> {
        self.post_form("/products", &[("name", name)]).await
    }

    pub async fn list_active_prices(&self, product_id: &str) -> Result<Vec<StripePrice>> {
        let list: List<StripePrice> = self
            .get_json(&format!(
                "/prices?active=true&limit=100&product={}",
                product_id
            ))
            .await?;
        Ok(list.data)
    }

    /// Create a price on a product. `recurring_interval` is None for
    /// one-time prices.
    pub async fn create_price(
        &self,
        product_id: &str,
        unit_amount_cents: i64,
        currency: &str,
        recurring_interval: Option<&str>,
    ) -> Result<StripePrice> {
        let amount = unit_amount_cents.to_string();
        let mut form = vec![
            ("product", product_id),
            ("unit_amount", amount.as_str()),
            ("currency", currency),
        ];
        if let Some(interval) = recurring_interval {
            form.push(("recurring[interval]", interval));
        }
        self.post_form("/prices", &form).await
    }

    /// Create a billing portal session so subscribers can manage or cancel
    /// their subscription on Stripe's hosted page.
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String> {
        let session: PortalSession = self
            .post_form(
                "/billing_portal/sessions",
                &[("customer", customer_id), ("return_url", return_url)],
            )
            .await?;
        Ok(session.url)
    }

    /// Maximum age of a webhook timestamp before it's rejected, per Stripe's
    /// recommended 5-minute replay window.
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Verify a `stripe-signature` header (`t=timestamp,v1=hexsig`) against
    /// the raw payload. Returns Ok(false) for a well-formed but wrong
    /// signature, Err for a malformed header.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| AppError::Internal("No webhook secret configured".into()))?;

        let mut timestamp = None;
        let mut sig_v1 = None;
        for part in signature.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;

        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::BadRequest(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let age = chrono::Utc::now().timestamp() - timestamp;
        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }
        // Clock skew tolerance for timestamps from the future: 60 seconds.
        if age < -60 {
            tracing::warn!("Stripe webhook rejected: timestamp in the future (age={}s)", age);
            return Ok(false);
        }

        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison; the length check leaks nothing since a
        // SHA-256 hex signature is always 64 chars.
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }
        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Pull the human-readable message out of a Stripe error body, falling back
/// to the raw body.
fn stripe_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| format!("Stripe API error: {}", body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_confirmed_when_paid() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "paid"
        }))
        .unwrap();
        assert!(session.is_confirmed());
    }

    #[test]
    fn session_confirmed_when_subscription_trialing() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "unpaid",
            "subscription": {"id": "sub_1", "status": "trialing"}
        }))
        .unwrap();
        assert!(session.is_confirmed());
    }

    #[test]
    fn session_not_confirmed_when_unpaid_and_sub_incomplete() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "unpaid",
            "subscription": {"id": "sub_1", "status": "incomplete"}
        }))
        .unwrap();
        assert!(!session.is_confirmed());
    }

    #[test]
    fn session_email_falls_back_to_expanded_customer() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "paid",
            "customer": {"id": "cus_1", "email": "Fallback@Example.com"}
        }))
        .unwrap();
        assert_eq!(session.customer_email().as_deref(), Some("fallback@example.com"));
    }

    #[test]
    fn session_plan_defaults_to_monthly() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "paid",
            "metadata": {}
        }))
        .unwrap();
        assert_eq!(session.plan(), Plan::Monthly);
    }

    #[test]
    fn expandable_parses_bare_id_and_object() {
        let bare: Expandable<StripeCustomer> =
            serde_json::from_value(serde_json::json!("cus_42")).unwrap();
        assert_eq!(bare.id(), "cus_42");
        assert!(bare.object().is_none());

        let expanded: Expandable<StripeCustomer> =
            serde_json::from_value(serde_json::json!({"id": "cus_42", "email": null})).unwrap();
        assert_eq!(expanded.id(), "cus_42");
        assert!(expanded.object().is_some());
    }
}
