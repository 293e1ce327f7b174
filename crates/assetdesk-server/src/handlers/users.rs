//! User handlers

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::services::auth::hash_password;
use crate::AppState;
use assetdesk_core::ports::UserStore;
use assetdesk_core::{
    DeskError, NewUser, PermissionAction, PermissionCategory, Permissions, User, UserUpdate,
    ValidationError, ADMIN_USERNAME,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

const CATEGORY: PermissionCategory = PermissionCategory::Users;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    username: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    department: Option<String>,
    #[serde(default)]
    is_admin: bool,
    permissions: Option<Permissions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    department: Option<String>,
    is_admin: Option<bool>,
    permissions: Option<Permissions>,
    password: Option<String>,
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            format!("password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

/// Non-admins cannot grant admin rights or permissions they do not hold
fn check_grant(
    caller: &User,
    grants_admin: bool,
    permissions: Option<&Permissions>,
) -> Result<(), ApiError> {
    if caller.is_admin {
        return Ok(());
    }
    if grants_admin {
        return Err(DeskError::Forbidden("only administrators can grant admin rights".into()).into());
    }
    if permissions.is_some_and(|p| !p.within(&caller.permissions)) {
        return Err(DeskError::Forbidden(
            "cannot grant permissions beyond your own".into(),
        )
        .into());
    }
    Ok(())
}

pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<User>>> {
    user.require(CATEGORY, PermissionAction::View)?;
    Ok(Json(state.storage.list_users().await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    user.require(CATEGORY, PermissionAction::View)?;
    state
        .storage
        .get_user(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User"))
}

pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    caller.require(CATEGORY, PermissionAction::Add)?;
    check_grant(&caller.0, req.is_admin, req.permissions.as_ref())?;

    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ValidationError::new("username", "username is required").into());
    }
    check_password(&req.password)?;

    let user = state
        .storage
        .create_user(NewUser {
            username,
            password_hash: hash_password(&req.password)?,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            department: req.department,
            is_admin: req.is_admin,
            permissions: req.permissions.unwrap_or_else(Permissions::default_user),
        })
        .await?;

    info!("User {} created by {}", user.username, caller.0.username);
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    caller.require(CATEGORY, PermissionAction::Edit)?;
    check_grant(
        &caller.0,
        req.is_admin.unwrap_or(false),
        req.permissions.as_ref(),
    )?;

    let target = state
        .storage
        .get_user(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    if target.is_admin && !caller.0.is_admin {
        return Err(DeskError::Forbidden("only administrators can change an administrator".into()).into());
    }

    let password_hash = match req.password.as_deref() {
        Some(password) => {
            check_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let update = UserUpdate {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        department: req.department,
        is_admin: req.is_admin,
        permissions: req.permissions,
        password_hash,
    };

    state
        .storage
        .update_user(&id, update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User"))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    caller.require(CATEGORY, PermissionAction::Edit)?;

    let target = state
        .storage
        .get_user(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    if target.username == ADMIN_USERNAME {
        return Err(DeskError::Forbidden("the built-in admin account cannot be deleted".into()).into());
    }
    if target.id == caller.0.id {
        return Err(DeskError::Forbidden("users cannot delete themselves".into()).into());
    }

    state.storage.delete_user(&id).await?;
    info!("User {} deleted by {}", target.username, caller.0.username);
    Ok(StatusCode::NO_CONTENT)
}
