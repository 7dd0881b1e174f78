use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};

use vantrack::config::TrackingConfig;
use vantrack::services::auth::{AuthVerifier, SessionVerifier, StaticTokenVerifier};
use vantrack::services::store::{MemoryVehicleStore, PgVehicleStore, VehicleStore};
use vantrack::{db, routes, state};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = TrackingConfig::from_env();
    let port = config.port;

    let (store, verifier): (Arc<dyn VehicleStore>, Arc<dyn AuthVerifier>) = match config.database_url.as_deref() {
        Some(url) => {
            let pool = match db::init_pool(url, config.db_max_connections).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!(error = %e, "database init failed");
                    std::process::exit(1);
                }
            };
            (Arc::new(PgVehicleStore::new(pool.clone())), Arc::new(SessionVerifier::new(pool)))
        }
        None => {
            let verifier = StaticTokenVerifier::from_pairs(&config.dev_tokens);
            if verifier.is_empty() {
                warn!("no DATABASE_URL and no DEV_TOKENS; every connection will be rejected");
            }
            info!("no DATABASE_URL; using in-memory vehicle store");
            (Arc::new(MemoryVehicleStore::new()), Arc::new(verifier))
        }
    };

    let state = state::AppState::new(config, store, verifier);
    let app = routes::app(state);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %port, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(%port, "vantrack listening");
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server failed");
    }
    info!("server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
