use std::net::SocketAddr;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use prism_api::api::{build_state, create_app, AppState};
use prism_api::config::AppConfig;
use prism_data::database::{initialize_database_pool, DatabaseConfig};
use prism_data::repository::{InMemoryStorage, PostgresStorage};
use prism_domain::auth::session::start_cleanup_task;
use prism_domain::health::StorageMode;

/// The main entry point for the PRISM API server
///
/// Loads `.env`, sets up tracing, connects PostgreSQL (falling back to
/// in-memory storage when it is unreachable), bootstraps the first
/// administrator and serves the router until Ctrl+C or SIGTERM.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        eprintln!("Warning: .env file not found or couldn't be read. Using environment variables.");
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stdout),
        )
        .with(env_filter)
        .init();

    info!("Starting PRISM API server");

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!("Environment: {}", config.environment);

    let state = connect_storage(&config).await?;
    start_cleanup_task(state.auth.sessions.clone());

    if let Some(admin) = &config.admin {
        match state
            .services
            .accounts
            .ensure_bootstrap_admin(&admin.username, &admin.password)
            .await
        {
            Ok(Some(account)) => info!("Created bootstrap administrator {}", account.username),
            Ok(None) => info!("Accounts already exist; skipping administrator bootstrap"),
            Err(e) => error!("Failed to create bootstrap administrator: {}", e),
        }
    }

    let app = create_app(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// PostgreSQL when reachable, otherwise the in-memory fallback
async fn connect_storage(config: &AppConfig) -> anyhow::Result<AppState> {
    let pool = match DatabaseConfig::from_env() {
        Ok(db_config) => initialize_database_pool(&db_config).await,
        Err(e) => Err(e),
    };

    match pool {
        Ok(pool) => {
            info!("Using PostgreSQL storage");
            build_state(config, PostgresStorage::new(pool), StorageMode::Postgres)
        }
        Err(e) => {
            error!("Failed to initialize database pool: {}", e);
            warn!("Falling back to in-memory storage; data will not survive a restart");
            build_state(config, InMemoryStorage::new(), StorageMode::InMemory)
        }
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down server...");
}
