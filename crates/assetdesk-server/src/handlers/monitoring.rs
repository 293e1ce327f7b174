//! Server monitoring proxy handlers

use crate::error::ApiResult;
use crate::extractors::{AuthUser, JsonBody};
use crate::AppState;
use assetdesk_core::{
    ConnectionTestResult, MetricsSnapshot, MonitoringConfig, PermissionAction, PermissionCategory,
};
use axum::{extract::State, Json};
use tracing::info;

pub async fn test_connection(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(config): JsonBody<MonitoringConfig>,
) -> ApiResult<Json<ConnectionTestResult>> {
    user.require(PermissionCategory::VmMonitoring, PermissionAction::View)?;
    config.validate()?;

    info!("Testing Zabbix connection to {} for {}", config.url, user.0.username);
    Ok(Json(state.zabbix.test_connection(&config).await?))
}

pub async fn metrics(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(config): JsonBody<MonitoringConfig>,
) -> ApiResult<Json<MetricsSnapshot>> {
    user.require(PermissionCategory::VmMonitoring, PermissionAction::View)?;
    config.validate()?;

    Ok(Json(state.zabbix.fetch_metrics(&config).await?))
}
