//! Liveness endpoint

use crate::AppState;
use assetdesk_core::ports::Storage;
use assetdesk_core::BackendKind;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    storage: BackendKind,
    version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage: state.storage.kind(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
