//! Accessory handlers

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::AppState;
use assetdesk_core::ports::AccessoryStore;
use assetdesk_core::{Accessory, NewAccessory, PermissionAction, PermissionCategory};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

const CATEGORY: PermissionCategory = PermissionCategory::Accessories;

pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Accessory>>> {
    user.require(CATEGORY, PermissionAction::View)?;
    Ok(Json(state.storage.list_accessories().await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Accessory>> {
    user.require(CATEGORY, PermissionAction::View)?;
    state
        .storage
        .get_accessory(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Accessory"))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<NewAccessory>,
) -> ApiResult<(StatusCode, Json<Accessory>)> {
    user.require(CATEGORY, PermissionAction::Add)?;
    req.validate()?;

    let accessory = state.storage.create_accessory(req).await?;
    info!("Accessory {} created by {}", accessory.id, user.0.username);
    Ok((StatusCode::CREATED, Json(accessory)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<NewAccessory>,
) -> ApiResult<Json<Accessory>> {
    user.require(CATEGORY, PermissionAction::Edit)?;
    req.validate()?;

    state
        .storage
        .update_accessory(&id, req)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Accessory"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(CATEGORY, PermissionAction::Edit)?;
    if state.storage.delete_accessory(&id).await? {
        info!("Accessory {} deleted by {}", id, user.0.username);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Accessory"))
    }
}
