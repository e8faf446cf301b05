use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pageforge::config::Config;
use pageforge::handlers;
use pageforge::rate_limit;
use pageforge::state::AppState;
use pageforge::store::{LicenseStore, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "pageforge")]
#[command(about = "PageForge backend: Stripe-gated licensing and generation proxy")]
struct Cli {
    /// Use the in-process license store instead of SQLite (dev mode only;
    /// licenses are lost on restart)
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pageforge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    match &config.stripe_secret_key {
        Some(key) if key.starts_with("sk_live") => tracing::info!("Stripe mode: LIVE"),
        Some(_) => tracing::info!("Stripe mode: TEST"),
        None => tracing::warn!("STRIPE_SECRET_KEY not set - billing endpoints disabled"),
    }
    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set - webhook payloads are NOT verified");
    }
    if config.access_token_secret.is_none() {
        tracing::warn!("ACCESS_TOKEN_SECRET not set - issuing unsigned (forgeable) access tokens");
    }

    let store: Arc<dyn LicenseStore> = if cli.memory_store && config.dev_mode {
        tracing::info!("Using in-memory license store (records lost on exit)");
        Arc::new(MemoryStore::new())
    } else {
        if cli.memory_store {
            tracing::warn!("--memory-store ignored: not in dev mode (set PAGEFORGE_ENV=dev)");
        }
        Arc::new(SqliteStore::open(&config.database_path).expect("Failed to open license database"))
    };

    let state = AppState::from_config(&config, store);

    // SPA fallback: serve static assets, unknown paths get index.html.
    let index = format!("{}/index.html", config.static_dir);
    let static_files = ServeDir::new(&config.static_dir).fallback(ServeFile::new(index));

    let app = Router::new()
        .merge(handlers::api_router().layer(rate_limit::api_layer(config.rate_limit_rpm)))
        .merge(handlers::webhook_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .fallback_service(static_files);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("PageForge server listening on {}", addr);

    // into_make_service_with_connect_info enables IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
