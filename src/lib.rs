pub mod accounts; // Staff accounts, login, bearer sessions
pub mod api; // HTTP router, middleware, endpoints
pub mod catalog; // Reference data + list/create-only collections
pub mod companies;
pub mod config;
pub mod core_state; // Transport-agnostic state
pub mod crypto;
pub mod db;
pub mod lab_results; // Sample workflow
pub mod models;
pub mod patient_import; // CSV bulk registration
pub mod patients;
pub mod payments; // Cash desk, paid_amount upkeep
pub mod protocols; // Visits, numbering, delete policy

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Startup failures reported by [`run`].
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Core(#[from] core_state::CoreError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load configuration, prepare the database and serve the API until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("OSGB_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");
    let bind_addr = config.bind_addr;

    let core = Arc::new(core_state::CoreState::initialize(config)?);
    let mut server = api::start_server_on(core, bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
