use std::collections::HashMap;

use tokio::sync::Mutex;

use super::stripe::StripeClient;
use crate::error::Result;
use crate::models::Plan;

/// Stripe product all plan prices hang off.
const PRODUCT_NAME: &str = "PageForge Pro";
const CURRENCY: &str = "usd";

const MONTHLY_AMOUNT_CENTS: i64 = 1200;
const LIFETIME_AMOUNT_CENTS: i64 = 4900;

fn plan_amount(plan: Plan) -> i64 {
    match plan {
        Plan::Monthly => MONTHLY_AMOUNT_CENTS,
        Plan::Lifetime => LIFETIME_AMOUNT_CENTS,
    }
}

fn plan_interval(plan: Plan) -> Option<&'static str> {
    match plan {
        Plan::Monthly => Some("month"),
        Plan::Lifetime => None,
    }
}

/// Process-wide plan → Stripe price id map.
///
/// Seeded from configuration when price ids are provided; otherwise the
/// first request for a plan find-or-creates the product and price on Stripe.
/// The mutex is held across the whole find-or-create so concurrent cold
/// starts resolve exactly once instead of racing duplicate Stripe objects.
pub struct PriceCache {
    prices: Mutex<HashMap<Plan, String>>,
}

impl PriceCache {
    pub fn new(monthly: Option<String>, lifetime: Option<String>) -> Self {
        let mut prices = HashMap::new();
        if let Some(id) = monthly {
            prices.insert(Plan::Monthly, id);
        }
        if let Some(id) = lifetime {
            prices.insert(Plan::Lifetime, id);
        }
        Self {
            prices: Mutex::new(prices),
        }
    }

    /// Resolve the price id for a plan, creating provider-side definitions
    /// on first use if none are configured.
    pub async fn price_for(&self, stripe: &StripeClient, plan: Plan) -> Result<String> {
        let mut prices = self.prices.lock().await;
        if let Some(id) = prices.get(&plan) {
            return Ok(id.clone());
        }

        let id = find_or_create_price(stripe, plan).await?;
        tracing::info!("Resolved Stripe price for {} plan: {}", plan, id);
        prices.insert(plan, id.clone());
        Ok(id)
    }
}

/// Find-or-create, idempotent against the provider: match the product by
/// name, then match an existing price by amount and recurrence, and only
/// create what is missing.
async fn find_or_create_price(stripe: &StripeClient, plan: Plan) -> Result<String> {
    let products = stripe.list_active_products().await?;
    let product_id = match products.into_iter().find(|p| p.name == PRODUCT_NAME) {
        Some(product) => product.id,
        None => {
            tracing::info!("Creating Stripe product \"{}\"", PRODUCT_NAME);
            stripe.create_product(PRODUCT_NAME).await?.id
        }
    };

    let amount = plan_amount(plan);
    let interval = plan_interval(plan);

    let prices = stripe.list_active_prices(&product_id).await?;
    let existing = prices.into_iter().find(|p| {
        p.unit_amount == Some(amount)
            && p.recurring.as_ref().map(|r| r.interval.as_str()) == interval
    });

    match existing {
        Some(price) => Ok(price.id),
        None => {
            tracing::info!("Creating Stripe price for {} plan", plan);
            let price = stripe
                .create_price(&product_id, amount, CURRENCY, interval)
                .await?;
            Ok(price.id)
        }
    }
}
