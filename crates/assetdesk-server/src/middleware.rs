//! Records every `/api` request in the event log

use crate::extractors::bearer_token;
use crate::AppState;
use assetdesk_core::events::{truncate_body, ApiRequestRecord};
use axum::{
    body::Body,
    extract::{ConnectInfo, OriginalUri, Request, State},
    http::header::USER_AGENT,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::warn;

/// Responses that carry credentials; their bodies are never logged
const REDACTED_PATHS: &[&str] = &["/api/login"];
const REDACTED: &str = "[redacted]";

pub async fn record_api_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string());
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let actor = bearer_token(request.headers())
        .and_then(|token| state.auth_service.validate_token(token).ok());

    let response = next.run(request).await;

    let redact = REDACTED_PATHS.contains(&path.as_str());
    let (parts, body) = response.into_parts();
    let (body, logged_body) = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let text = (!bytes.is_empty()).then(|| {
                if redact {
                    REDACTED.to_string()
                } else {
                    truncate_body(&String::from_utf8_lossy(&bytes))
                }
            });
            (Body::from(bytes), text)
        }
        Err(e) => {
            warn!("Could not buffer response body for {} {}: {}", method, path, e);
            (Body::empty(), None)
        }
    };

    state
        .events
        .api_request(ApiRequestRecord {
            method,
            path,
            status: parts.status.as_u16(),
            duration_ms: started.elapsed().as_millis() as u64,
            response_body: logged_body,
            actor,
            remote_addr,
            user_agent,
        })
        .await;

    Response::from_parts(parts, body)
}
