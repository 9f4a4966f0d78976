mod config;
mod errors;
mod llm_client;
mod matching;
mod models;
mod routes;
mod session;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::matching::batch::BatchSettings;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::RestStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recruit API v{}", env!("CARGO_PKG_VERSION"));

    let store = RestStore::new(&config.persistence_api_url);
    info!("Persistence API: {}", config.persistence_api_url);

    let llm = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_api_base.clone(),
    );
    if llm.ensure_configured().is_ok() {
        info!("Gemini client initialized (model: {})", llm.model());
    } else {
        warn!("No Gemini API key configured; analysis and JD extraction will fail");
    }

    let settings = BatchSettings {
        throttle: config.batch_throttle,
        success_banner: config.success_banner,
    };
    info!(
        "Batch throttle {}ms, success banner {}ms",
        settings.throttle.as_millis(),
        settings.success_banner.as_millis()
    );

    let state = AppState::new(store, llm, settings);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
