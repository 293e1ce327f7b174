//! Port traits (interfaces) for dependency injection

pub mod durable;
pub mod events;
pub mod storage;

pub use durable::{ConnectionStatus, DurableConnector};
pub use events::EventSink;
pub use storage::{AccessoryStore, AssetStore, ConsumableStore, LicenseStore, Storage, UserStore};
