//! HTTP handlers

pub mod accessories;
pub mod assets;
pub mod auth;
pub mod consumables;
pub mod health;
pub mod licenses;
pub mod monitoring;
pub mod users;

pub use health::health;
