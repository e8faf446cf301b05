use std::sync::Arc;

use crate::config::Config;
use crate::generate::GenerationProxy;
use crate::payments::{PriceCache, StripeClient};
use crate::store::LicenseStore;
use crate::token::TokenIssuer;

/// Shared application state. Cheap to clone; handlers run concurrently
/// against the same store and price cache.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LicenseStore>,
    /// None when STRIPE_SECRET_KEY is unset; billing endpoints then fail
    /// with a configuration error instead of at startup.
    pub stripe: Option<Arc<StripeClient>>,
    pub prices: Arc<PriceCache>,
    pub tokens: Arc<TokenIssuer>,
    /// None when ANTHROPIC_API_KEY is unset.
    pub generator: Option<Arc<GenerationProxy>>,
    /// Public base URL for checkout redirects and the portal return URL.
    pub app_url: String,
}

impl AppState {
    pub fn from_config(config: &Config, store: Arc<dyn LicenseStore>) -> Self {
        let stripe = config.stripe_secret_key.as_deref().map(|key| {
            Arc::new(StripeClient::new(
                key,
                config.stripe_webhook_secret.as_deref(),
            ))
        });

        let generator = config
            .anthropic_api_key
            .as_deref()
            .map(|key| Arc::new(GenerationProxy::new(key, &config.anthropic_model)));

        Self {
            store,
            stripe,
            prices: Arc::new(PriceCache::new(
                config.stripe_price_monthly.clone(),
                config.stripe_price_lifetime.clone(),
            )),
            tokens: Arc::new(TokenIssuer::from_secret(config.access_token_secret.clone())),
            generator,
            app_url: config.app_url.clone(),
        }
    }
}
