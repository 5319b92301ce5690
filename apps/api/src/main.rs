mod auth;
mod config;
mod errors;
mod llm_client;
mod optimizer;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::service::AccessControl;
use crate::auth::session::SessionRegistry;
use crate::auth::store::{CredentialStore, FileKvStore};
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::optimizer::gateway::GeminiCvGateway;
use crate::routes::build_router;
use crate::state::AppState;

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

    info!("Starting ATS Master API v{}", env!("CARGO_PKG_VERSION"));

    // Credential store (users + access requests) under DATA_DIR
    let kv = Arc::new(FileKvStore::new(config.data_dir.clone()));
    let store = Arc::new(CredentialStore::new(kv));
    info!("Credential store at {}", config.data_dir.display());

    let access = AccessControl::new(store, config.admin.as_ref().map(|a| a.email.clone()));
    match &config.admin {
        Some(seed) => {
            access.seed_admin(seed).await?;
        }
        None => warn!("ADMIN_EMAIL not set; no admin account will be seeded"),
    }

    // Initialize LLM client
    let llm = LlmClient::new(config.gemini_api_key.clone(), config.gemini_base_url.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let state = AppState {
        access,
        sessions: SessionRegistry::default(),
        gateway: Arc::new(GeminiCvGateway::new(llm)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
