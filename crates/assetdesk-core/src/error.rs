//! Error types for AssetDesk

use assetdesk_types::ValidationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeskError>;

#[derive(Error, Debug)]
pub enum DeskError {
    // Bootstrap-phase failures. All of these are downgraded at their origin.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Backend init error: {0}")]
    BackendInit(String),

    #[error("Admin bootstrap error: {0}")]
    AdminBootstrap(String),

    #[error("Logging error: {0}")]
    Logging(String),

    // Request-phase failures
    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeskError {
    /// True for the degraded-mode kinds raised while bootstrapping
    pub fn is_bootstrap_phase(&self) -> bool {
        matches!(
            self,
            DeskError::Connection(_)
                | DeskError::Migration(_)
                | DeskError::BackendInit(_)
                | DeskError::AdminBootstrap(_)
                | DeskError::Logging(_)
        )
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(e: serde_json::Error) -> Self {
        DeskError::Serialization(e.to_string())
    }
}
