//! Auth extractor for protected routes

use crate::error::ApiError;
use crate::AppState;
use assetdesk_core::ports::UserStore;
use assetdesk_core::{DeskError, PermissionAction, PermissionCategory, User};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

/// The user behind a valid Bearer token
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

impl AuthUser {
    /// Fails with 403 unless the user may perform `action` on `category`
    pub fn require(
        &self,
        category: PermissionCategory,
        action: PermissionAction,
    ) -> Result<(), ApiError> {
        if self.0.can(category, action) {
            Ok(())
        } else {
            Err(DeskError::Forbidden(format!(
                "{} may not {:?} {}",
                self.0.username, action, category
            ))
            .into())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing or malformed Authorization header"))?;

        let user_id = state.auth_service.validate_token(token)?;

        // Tokens of deleted users stop working immediately
        let user = state
            .storage
            .get_user(&user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

        Ok(AuthUser(user))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
