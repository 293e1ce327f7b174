//! Authentication handlers

use crate::error::ApiResult;
use crate::extractors::{AuthUser, JsonBody};
use crate::AppState;
use assetdesk_core::User;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    access_token: String,
    expires_in: i64,
    user: User,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (user, tokens) = state
        .auth_service
        .login(req.username.trim(), &req.password)
        .await
        .map_err(|e| {
            warn!("Login failed for {}: {}", req.username, e);
            e
        })?;

    info!("Login successful for: {}", user.username);

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        expires_in: tokens.expires_in,
        user,
    }))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
