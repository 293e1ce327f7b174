//! AssetDesk Core Library
//!
//! Error taxonomy, event records and the port traits implemented by the
//! server's storage backends and event sinks.

// Re-export pure types from assetdesk-types
pub use assetdesk_types::*;

pub mod error;
pub mod events;
pub mod ports;

pub use error::{DeskError, Result};
