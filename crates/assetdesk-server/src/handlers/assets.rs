//! Hardware asset handlers

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::AppState;
use assetdesk_core::ports::AssetStore;
use assetdesk_core::{Asset, NewAsset, PermissionAction, PermissionCategory};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

const CATEGORY: PermissionCategory = PermissionCategory::Assets;

pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Asset>>> {
    user.require(CATEGORY, PermissionAction::View)?;
    Ok(Json(state.storage.list_assets().await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Asset>> {
    user.require(CATEGORY, PermissionAction::View)?;
    state
        .storage
        .get_asset(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Asset"))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<NewAsset>,
) -> ApiResult<(StatusCode, Json<Asset>)> {
    user.require(CATEGORY, PermissionAction::Add)?;
    req.validate()?;

    let asset = state.storage.create_asset(req).await?;
    info!("Asset {} ({}) created by {}", asset.asset_tag, asset.id, user.0.username);
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<NewAsset>,
) -> ApiResult<Json<Asset>> {
    user.require(CATEGORY, PermissionAction::Edit)?;
    req.validate()?;

    state
        .storage
        .update_asset(&id, req)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Asset"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(CATEGORY, PermissionAction::Edit)?;
    if state.storage.delete_asset(&id).await? {
        info!("Asset {} deleted by {}", id, user.0.username);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Asset"))
    }
}
