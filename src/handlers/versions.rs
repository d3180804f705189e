//! Document version handlers (read-only).

use axum::{extract::State, response::Response, Json};

use super::attachment;
use super::extract::IdPath;
use crate::auth::AuthUser;
use crate::dto::VersionResponse;
use crate::error::AppResult;
use crate::permissions::Requester;
use crate::services::Actor;
use crate::SharedState;

/// Versions of every document visible to the caller.
///
/// `GET /api/documents/versions`
pub async fn list(State(state): State<SharedState>, user: AuthUser) -> AppResult<Json<Vec<VersionResponse>>> {
    Ok(Json(state.versions.list(Requester::from(&user)).await?))
}

/// `GET /api/documents/versions/{id}`
pub async fn get(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<VersionResponse>> {
    Ok(Json(state.versions.get(Requester::from(&user), id).await?))
}

/// Stored file of one version, named `<stem>_v<n><ext>`.
///
/// `GET /api/documents/versions/{id}/download`
pub async fn download(State(state): State<SharedState>, actor: Actor, IdPath(id): IdPath) -> AppResult<Response> {
    let file = state.versions.download(&actor, id).await?;
    attachment(file)
}
