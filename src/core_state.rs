//! Transport-agnostic application state.
//!
//! `CoreState` is created once at startup, runs migrations, and is then
//! shared (behind `Arc`) by every request. It holds no mutable business
//! state: everything lives in SQLite and each request opens its own
//! connection.

use std::path::Path;

use crate::config::AppConfig;
use crate::db;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct CoreState {
    pub config: AppConfig,
}

impl CoreState {
    /// Prepare the database file (directories + migrations) and build the state.
    pub fn initialize(config: AppConfig) -> Result<Self, CoreError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Opened once for migrations, then dropped.
        db::open_database(&config.db_path)?;
        tracing::info!(path = %config.db_path.display(), "Database ready");
        Ok(Self { config })
    }

    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    /// Open a database connection for one request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_connection(self.db_path()).map_err(CoreError::Database)
    }
}
