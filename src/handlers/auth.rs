//! Account and token endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::extract::JsonBody;
use crate::auth::{AuthUser, TokenPair};
use crate::dto::{
    AccessTokenResponse, RegisterRequest, TokenObtainRequest, TokenRefreshRequest, TokenVerifyRequest,
};
use crate::error::AppResult;
use crate::models::UserMinimal;
use crate::permissions::Requester;
use crate::SharedState;

/// Register a new account.
///
/// `POST /api/auth/users`
///
/// ```json
/// {"username": "alice", "email": "alice@example.com", "password": "s3cret-pass"}
/// ```
pub async fn register(
    State(state): State<SharedState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserMinimal>)> {
    let user = state.users.register(&request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List users: everyone for staff/admin, otherwise only the caller.
///
/// `GET /api/auth/users`
pub async fn list_users(State(state): State<SharedState>, user: AuthUser) -> AppResult<Json<Vec<UserMinimal>>> {
    Ok(Json(state.users.list(Requester::from(&user)).await?))
}

/// `GET /api/auth/users/me`
pub async fn me(State(state): State<SharedState>, user: AuthUser) -> AppResult<Json<UserMinimal>> {
    Ok(Json(state.users.me(user.id).await?))
}

/// Obtain an access/refresh pair.
///
/// `POST /api/auth/jwt/create`
///
/// # Response
///
/// ```json
/// {"access": "eyJ...", "refresh": "eyJ..."}
/// ```
pub async fn create_token(
    State(state): State<SharedState>,
    JsonBody(request): JsonBody<TokenObtainRequest>,
) -> AppResult<Json<TokenPair>> {
    let pair = state
        .users
        .obtain_pair(&request.username, &request.password)
        .await?;
    Ok(Json(pair))
}

/// `POST /api/auth/jwt/refresh`
pub async fn refresh_token(
    State(state): State<SharedState>,
    JsonBody(request): JsonBody<TokenRefreshRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    let access = state.users.refresh(&request.refresh).await?;
    Ok(Json(AccessTokenResponse { access }))
}

/// `POST /api/auth/jwt/verify`
///
/// Returns `{}` for a valid token, 401 otherwise.
pub async fn verify_token(
    State(state): State<SharedState>,
    JsonBody(request): JsonBody<TokenVerifyRequest>,
) -> AppResult<Json<Value>> {
    state.users.verify(&request.token)?;
    Ok(Json(json!({})))
}
