pub mod config;
pub mod db;
pub mod errors;
pub mod http;
pub mod kanban;
pub mod models;
pub mod notes;
pub mod registry;
pub mod snapshot;
pub mod store;

use crate::config::HubConfig;
use crate::errors::{AppError, AppResult};
use crate::http::HubState;
use crate::registry::AppRegistry;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Builds the shared handler state. A storage backend that fails to open is
/// logged and left out; the apps side keeps working.
pub fn build_state(config: &HubConfig) -> HubState {
    let registry = Arc::new(AppRegistry::new(&config.apps_dir));
    if let Err(error) = registry.rescan() {
        tracing::warn!(error = %error, "initial app scan failed");
    }

    let stores = match store::open_stores(config) {
        Ok(stores) => stores,
        Err(error) => {
            tracing::warn!(error = %error, "data stores unavailable; notes and kanban endpoints will report 503");
            None
        }
    };

    HubState {
        registry,
        stores,
        static_dir: config.static_dir.clone(),
    }
}

pub async fn run(config: HubConfig) -> AppResult<()> {
    let state = build_state(&config);
    let apps_root = state.registry.root().display().to_string();
    let app = http::router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|error| AppError::Config(format!("failed to bind {}: {}", bind_addr, error)))?;
    tracing::info!(addr = %bind_addr, apps = %apps_root, "app hub listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::from)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// JSON logs to a daily file when `log_dir` is set, plain stderr output otherwise.
pub fn init_tracing(log_dir: Option<&Path>) -> AppResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).map_err(|error| AppError::Storage(error.to_string()))?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "app-hub.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(non_blocking)
                .try_init()
                .map_err(|error| AppError::Internal(error.to_string()))
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| AppError::Internal(error.to_string())),
    }
}
