//! AssetDesk Types - Pure type definitions
//!
//! Domain records and validation rules shared by the server and the CLI.
//! No async runtime dependencies.

pub mod inventory;
pub mod monitoring;
pub mod user;

pub use inventory::*;
pub use monitoring::*;
pub use user::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which storage backend is serving requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Durable,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Durable => write!(f, "durable"),
        }
    }
}

/// A field failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
