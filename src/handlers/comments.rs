//! Comment API handlers.

use axum::{extract::State, http::StatusCode, Json};

use super::extract::{IdPath, JsonBody};
use crate::auth::AuthUser;
use crate::dto::{CommentCreateRequest, CommentResponse, CommentUpdateRequest};
use crate::error::AppResult;
use crate::permissions::Requester;
use crate::services::Actor;
use crate::SharedState;

/// Comments on documents visible to the caller, newest first.
///
/// `GET /api/documents/comments`
pub async fn list(State(state): State<SharedState>, user: AuthUser) -> AppResult<Json<Vec<CommentResponse>>> {
    Ok(Json(state.comments.list(Requester::from(&user)).await?))
}

/// `POST /api/documents/comments`
///
/// ```json
/// {"document": "0b6e...", "content": "Please review", "parent_id": null}
/// ```
pub async fn create(
    State(state): State<SharedState>,
    actor: Actor,
    JsonBody(request): JsonBody<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let comment = state
        .comments
        .create(&actor, request.document, &request.content, request.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// `GET /api/documents/comments/{id}`
pub async fn get(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<CommentResponse>> {
    Ok(Json(state.comments.get(Requester::from(&user), id).await?))
}

/// `PUT /api/documents/comments/{id}`
pub async fn update(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<CommentUpdateRequest>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state
        .comments
        .update(Requester::from(&user), id, &request, false)
        .await?;
    Ok(Json(comment))
}

/// `PATCH /api/documents/comments/{id}`
pub async fn partial_update(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<CommentUpdateRequest>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state
        .comments
        .update(Requester::from(&user), id, &request, true)
        .await?;
    Ok(Json(comment))
}

/// `DELETE /api/documents/comments/{id}`
pub async fn delete(State(state): State<SharedState>, user: AuthUser, IdPath(id): IdPath) -> AppResult<StatusCode> {
    state.comments.delete(Requester::from(&user), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
