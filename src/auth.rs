//! Authentication: password hashing, JWT issuance and the `AuthUser` extractor.
//!
//! Tokens follow the access/refresh pair model: short-lived access tokens
//! authenticate API calls, refresh tokens only mint new access tokens.

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::SharedState;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Authentication failures
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    #[error("Given token not valid for any token type")]
    InvalidToken,

    #[error("Token has wrong type")]
    WrongTokenType,

    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("User not found or inactive")]
    InactiveUser,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hashing(msg) | AuthError::Encoding(msg) => AppError::Message(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

/// Hash a password into an Argon2 PHC string
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// `hash_password` on the blocking pool
pub async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(format!("Task join error: {}", e)))?
}

/// `verify_password` on the blocking pool; a failed task counts as a mismatch
pub async fn verify_password_blocking(password: String, password_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub token_type: TokenType,
}

/// Access/refresh pair returned on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// HS256 signing keys and token lifetimes
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret_key.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        }
    }

    fn issue(&self, user_id: Uuid, token_type: TokenType, issued_at: i64) -> Result<String, AuthError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: user_id,
            exp: issued_at + ttl,
            iat: issued_at,
            jti: Uuid::new_v4().simple().to_string(),
            token_type,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.issue(user_id, TokenType::Access, chrono::Utc::now().timestamp())
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let now = chrono::Utc::now().timestamp();
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access, now)?,
            refresh: self.issue(user_id, TokenType::Refresh, now)?,
        })
    }

    /// Decode and validate signature and expiry
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected token: {}", e);
                AuthError::InvalidToken
            })
    }

    /// Decode a token that must be of the given type
    pub fn decode_as(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = self.decode(token)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }
}

/// Extract the token from `Authorization: Bearer <token>` (or `JWT <token>`)
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    (scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("jwt")).then_some(token)
}

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
    pub is_admin: bool,
}

impl AuthUser {
    /// Staff and admins bypass ownership checks
    pub fn is_privileged(&self) -> bool {
        self.is_staff || self.is_admin
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = bearer_token(header).ok_or(AuthError::InvalidToken)?;
        let claims = state.tokens.decode_as(token, TokenType::Access)?;

        let user = state
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::InactiveUser)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            is_staff: user.is_staff,
            is_admin: user.is_admin,
        })
    }
}
