use std::env;

/// Server configuration, loaded once at startup from the environment
/// (with `.env` support via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Public base URL used for Stripe success/cancel redirects and the
    /// billing portal return URL.
    pub app_url: String,
    pub database_path: String,
    /// Directory served as the SPA fallback.
    pub static_dir: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    /// Pre-configured Stripe price ids; when absent the price cache
    /// find-or-creates them on first use.
    pub stripe_price_monthly: Option<String>,
    pub stripe_price_lifetime: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    /// When set, access tokens are HMAC-signed with expiry instead of the
    /// plain reversible encoding.
    pub access_token_secret: Option<String>,
    /// Per-IP requests per minute on API routes.
    pub rate_limit_rpm: u32,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PAGEFORGE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let app_url =
            env::var("APP_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            app_url,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "pageforge.db".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").ok(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
            stripe_price_monthly: env::var("STRIPE_PRICE_MONTHLY").ok(),
            stripe_price_lifetime: env::var("STRIPE_PRICE_LIFETIME").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-5".to_string()),
            access_token_secret: env::var("ACCESS_TOKEN_SECRET").ok(),
            rate_limit_rpm: env::var("RATE_LIMIT_RPM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
