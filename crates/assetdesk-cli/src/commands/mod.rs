//! CLI commands

pub mod auth;
pub mod config;
pub mod monitor;
