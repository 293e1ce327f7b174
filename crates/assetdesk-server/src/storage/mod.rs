//! Storage layer
//!
//! Two backends behind one handle: DashMap (in-memory, default) and
//! SQLite (durable, selected by the bootstrap sequence).

pub mod connector;
pub mod db;
pub mod handle;
pub mod memory;
pub mod migrations;

pub use connector::SqlConnector;
pub use handle::StorageHandle;
pub use memory::MemoryStorage;
