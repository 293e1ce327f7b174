//! Monitoring dashboard: retrying fetches and terminal rendering

pub mod dashboard;
pub mod retry;

pub use dashboard::render;
pub use retry::RetryExecutor;
