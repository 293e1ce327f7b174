//! HTTP error responses

use assetdesk_core::{DeskError, ValidationError};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found", what))
    }
}

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        let status = match &err {
            DeskError::NotFound(_) => StatusCode::NOT_FOUND,
            DeskError::Conflict(_) => StatusCode::CONFLICT,
            DeskError::Validation(_) | DeskError::Config(_) | DeskError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            DeskError::Authentication(_) => StatusCode::UNAUTHORIZED,
            DeskError::Forbidden(_) => StatusCode::FORBIDDEN,
            DeskError::Upstream(_) => StatusCode::BAD_GATEWAY,
            DeskError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", err);
        }

        Self::new(status, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        DeskError::Validation(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DeskError::NotFound("asset".into()), StatusCode::NOT_FOUND),
            (DeskError::Conflict("tag".into()), StatusCode::CONFLICT),
            (
                DeskError::Validation(ValidationError::new("seats", "too many")),
                StatusCode::BAD_REQUEST,
            ),
            (
                DeskError::Authentication("bad password".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (DeskError::Forbidden("assets.edit".into()), StatusCode::FORBIDDEN),
            (DeskError::Upstream("zabbix down".into()), StatusCode::BAD_GATEWAY),
            (
                DeskError::Database("disk I/O".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                DeskError::Internal("failed to hash password".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_authentication_message_is_preserved() {
        let err = ApiError::from(DeskError::Authentication("Login name or password is incorrect".into()));
        assert!(err.message.starts_with("Authentication failed"));
    }
}
