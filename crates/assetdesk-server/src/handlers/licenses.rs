//! Software license handlers

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::AppState;
use assetdesk_core::ports::LicenseStore;
use assetdesk_core::{License, NewLicense, PermissionAction, PermissionCategory};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

const CATEGORY: PermissionCategory = PermissionCategory::Licenses;

pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<License>>> {
    user.require(CATEGORY, PermissionAction::View)?;
    Ok(Json(state.storage.list_licenses().await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<License>> {
    user.require(CATEGORY, PermissionAction::View)?;
    state
        .storage
        .get_license(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("License"))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<NewLicense>,
) -> ApiResult<(StatusCode, Json<License>)> {
    user.require(CATEGORY, PermissionAction::Add)?;
    req.validate()?;

    let license = state.storage.create_license(req).await?;
    info!("License {} created by {}", license.id, user.0.username);
    Ok((StatusCode::CREATED, Json(license)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<NewLicense>,
) -> ApiResult<Json<License>> {
    user.require(CATEGORY, PermissionAction::Edit)?;
    req.validate()?;

    state
        .storage
        .update_license(&id, req)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("License"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(CATEGORY, PermissionAction::Edit)?;
    if state.storage.delete_license(&id).await? {
        info!("License {} deleted by {}", id, user.0.username);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("License"))
    }
}
