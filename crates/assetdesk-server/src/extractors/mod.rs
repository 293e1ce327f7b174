//! Request extractors

pub mod auth;
pub mod json;

pub use auth::{bearer_token, AuthUser};
pub use json::JsonBody;
