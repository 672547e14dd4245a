pub mod api; // HTTP router, middleware, server lifecycle
pub mod audit; // Append-only audit trail
pub mod auth; // Credential & session gate
pub mod config;
pub mod core_state; // Process-wide state built once at startup
pub mod crypto; // Field codec + secret hashing
pub mod db;
pub mod models;
pub mod records; // Validation + codec between handlers and repositories

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::HttpOptions;
use crate::config::{Config, ConfigError};
use crate::core_state::{CoreError, CoreState};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Cannot start API server: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the service and block until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Config::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let core = Arc::new(CoreState::from_config(&config)?);
    core.bootstrap(&config)?;

    match core.prune_audit() {
        Ok(0) => {}
        Ok(pruned) => tracing::info!(pruned, "Expired audit entries pruned"),
        Err(e) => tracing::warn!("Audit pruning skipped: {e}"),
    }

    let server = api::start_api_server(core, config.bind, &HttpOptions::from(&config)).await?;
    tracing::info!(addr = %server.addr, "Listening");

    api::server::ctrl_c().await;
    tracing::info!("Shutting down");
    server.stop().await;
    Ok(())
}
