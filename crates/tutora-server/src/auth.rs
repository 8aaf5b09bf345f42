//! Bearer-token authentication and password hashing.
//!
//! Tokens are HS256 JWTs carrying the account id and role. Every
//! authenticated request reloads the account so role changes and removed
//! accounts take effect immediately.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tutora_shared::Role;
use tutora_store::{Account, StoreError};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ApiError;

const UNAUTHORIZED: &str = "Not authorized to access this route";

/// JWT claims structure for authentication.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

pub fn issue_token(account: &Account, config: &ServerConfig) -> Result<String, ApiError> {
    let ttl = chrono::Duration::from_std(config.jwt_ttl)
        .map_err(|e| ApiError::Internal(format!("invalid token lifetime: {e}")))?;
    let claims = Claims {
        sub: account.id,
        role: account.role,
        exp: (Utc::now() + ttl).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

/// Argon2 PHC string for `password`. CPU-bound; run it off the runtime.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
}

pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Account);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    /// Reject callers whose role is not `role`.
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.0.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let unauthorized = || ApiError::Unauthorized(UNAUTHORIZED.into());

        let token = bearer(parts).ok_or_else(unauthorized)?;
        let claims = decode_token(token, &state.config.jwt_secret).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            unauthorized()
        })?;

        let account = state.with_db(|db| match db.get_account(claims.sub) {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(unauthorized()),
            Err(e) => Err(e.into()),
        })?;
        Ok(AuthUser(account))
    }
}
