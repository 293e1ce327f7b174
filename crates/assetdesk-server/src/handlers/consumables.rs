//! Consumable handlers

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::AppState;
use assetdesk_core::ports::ConsumableStore;
use assetdesk_core::{Consumable, NewConsumable, PermissionAction, PermissionCategory};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

const CATEGORY: PermissionCategory = PermissionCategory::Consumables;

pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Consumable>>> {
    user.require(CATEGORY, PermissionAction::View)?;
    Ok(Json(state.storage.list_consumables().await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Consumable>> {
    user.require(CATEGORY, PermissionAction::View)?;
    state
        .storage
        .get_consumable(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Consumable"))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<NewConsumable>,
) -> ApiResult<(StatusCode, Json<Consumable>)> {
    user.require(CATEGORY, PermissionAction::Add)?;
    req.validate()?;

    let consumable = state.storage.create_consumable(req).await?;
    info!("Consumable {} created by {}", consumable.id, user.0.username);
    Ok((StatusCode::CREATED, Json(consumable)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<NewConsumable>,
) -> ApiResult<Json<Consumable>> {
    user.require(CATEGORY, PermissionAction::Edit)?;
    req.validate()?;

    state
        .storage
        .update_consumable(&id, req)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Consumable"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(CATEGORY, PermissionAction::Edit)?;
    if state.storage.delete_consumable(&id).await? {
        info!("Consumable {} deleted by {}", id, user.0.username);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Consumable"))
    }
}
