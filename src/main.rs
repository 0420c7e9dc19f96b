//! Forex Request Backend Server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;

use forex_request_backend::config::Config;
use forex_request_backend::db;
use forex_request_backend::notifications::{HttpMailer, LogMailer, Mailer};
use forex_request_backend::routes::build_router;
use forex_request_backend::state::AppState;
use forex_request_backend::store::{DocumentStore, MemoryDocumentStore, PgDocumentStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        database = %config.database_url_masked(),
        "Starting forex request backend"
    );

    let store: Arc<dyn DocumentStore> = match config.database_url {
        Some(_) => {
            let pool = db::create_pool(&config).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgDocumentStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory document store");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match config.mail_api_url.as_deref() {
        Some(url) => Arc::new(HttpMailer::new(url)),
        None => {
            tracing::info!("MAIL_API_URL not set, notifications are logged only");
            Arc::new(LogMailer)
        }
    };

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    let port = config.port;
    let state = AppState::from_parts(config, store, mailer);
    state
        .auth_service
        .ensure_default_roles()
        .await
        .context("Failed to create default roles")?;
    if let Some((username, password)) = state.config.bootstrap_admin() {
        state
            .auth_service
            .ensure_admin(username, password)
            .await
            .context("Failed to create the bootstrap administrator")?;
    }

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
