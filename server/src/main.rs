//! Classroom Server - Main Entry Point

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use classroom_server::auth::{GoogleIdTokenVerifier, IdentityVerifier};
use classroom_server::{api, config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classroom_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Classroom Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;
    let store = Arc::new(db::PgStore::new(db_pool));

    // Google sign-in (optional - disabled if not configured or discovery fails)
    let verifier: Option<Arc<dyn IdentityVerifier>> = match &config.google_client_id {
        Some(client_id) => {
            match GoogleIdTokenVerifier::discover(&config.google_issuer_url, client_id).await {
                Ok(verifier) => {
                    info!("Google sign-in enabled");
                    Some(Arc::new(verifier))
                }
                Err(e) => {
                    warn!(error = %e, "Google discovery failed. Federated login disabled.");
                    None
                }
            }
        }
        None => {
            info!("GOOGLE_CLIENT_ID not set. Federated login disabled.");
            None
        }
    };

    // Build application state
    let bind_address = config.bind_address.clone();
    let state = api::AppState::new(config, store, verifier);

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
