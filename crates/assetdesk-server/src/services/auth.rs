//! Authentication service

use crate::storage::StorageHandle;
use assetdesk_core::ports::UserStore;
use assetdesk_core::{AuthTokens, DeskError, Result, User};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access token lifetime
const TOKEN_TTL_HOURS: i64 = 12;

pub struct AuthService {
    storage: Arc<StorageHandle>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(storage: Arc<StorageHandle>, jwt_secret: String) -> Self {
        Self {
            storage,
            jwt_secret,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(User, AuthTokens)> {
        let user = self.storage.get_user_by_username(username).await?;

        if let Some(user) = user {
            if verify_password(password, &user.password_hash) {
                let tokens = self.generate_tokens(&user.id)?;
                return Ok((user, tokens));
            }
        }

        Err(DeskError::Authentication("invalid credentials".to_string()))
    }

    /// Returns the user id carried by a valid token
    pub fn validate_token(&self, token: &str) -> Result<String> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| DeskError::Authentication(format!("invalid token: {}", e)))?;

        Ok(token_data.claims.sub)
    }

    fn generate_tokens(&self, user_id: &str) -> Result<AuthTokens> {
        let now = Utc::now();
        let ttl = Duration::hours(TOKEN_TTL_HOURS);
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| DeskError::Authentication(format!("cannot sign token: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            expires_in: ttl.num_seconds(),
        })
    }
}

/// argon2id hash in PHC string format
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DeskError::Internal(format!("failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    exp: i64,    // expiration time
    iat: i64,    // issued at
}
