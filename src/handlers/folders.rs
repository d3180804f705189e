//! Folder API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::extract::{query_bool, query_id, IdPath, JsonBody, QueryParams};
use crate::auth::AuthUser;
use crate::dto::{FolderContentsResponse, FolderDetailResponse, FolderRequest, FolderResponse, ShareRequest};
use crate::error::AppResult;
use crate::permissions::Requester;
use crate::repositories::filters::{parse_ordering, search_terms};
use crate::repositories::folder_repository::FOLDER_ORDERING_FIELDS;
use crate::repositories::FolderFilter;
use crate::SharedState;

/// Query parameters for listing folders.
#[derive(Debug, Deserialize, Default)]
pub struct ListFoldersQuery {
    pub is_public: Option<String>,

    /// Parent folder id
    pub parent: Option<String>,

    /// Terms matched against name and description
    pub search: Option<String>,

    /// Comma separated `name`, `created_at`, `modified_at`; `-` for descending
    pub ordering: Option<String>,
}

impl ListFoldersQuery {
    fn into_filter(self) -> AppResult<FolderFilter> {
        Ok(FolderFilter {
            is_public: query_bool("is_public", self.is_public.as_deref())?,
            parent_id: query_id("parent", self.parent.as_deref())?,
            search: search_terms(self.search.as_deref()),
            ordering: parse_ordering(self.ordering.as_deref(), FOLDER_ORDERING_FIELDS),
        })
    }
}

/// Folders the caller owns, was shared, or that are public.
///
/// `GET /api/documents/folders`
///
/// # Query Parameters
///
/// - `is_public`, `parent`: exact filters
/// - `search`: name and description
/// - `ordering`: e.g. `name,-created_at`
pub async fn list(
    State(state): State<SharedState>,
    user: AuthUser,
    QueryParams(query): QueryParams<ListFoldersQuery>,
) -> AppResult<Json<Vec<FolderResponse>>> {
    let folders = state
        .folders
        .list(Requester::from(&user), &query.into_filter()?)
        .await?;
    Ok(Json(folders))
}

/// Create a folder owned by the caller.
///
/// `POST /api/documents/folders`
///
/// ```json
/// {"name": "Reports", "parent_id": null, "is_public": false}
/// ```
pub async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(request): JsonBody<FolderRequest>,
) -> AppResult<(StatusCode, Json<FolderResponse>)> {
    let folder = state.folders.create(Requester::from(&user), &request).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// `GET /api/documents/folders/{id}`
pub async fn get(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<FolderDetailResponse>> {
    Ok(Json(state.folders.get(Requester::from(&user), id).await?))
}

/// `PUT /api/documents/folders/{id}`
pub async fn update(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<FolderRequest>,
) -> AppResult<Json<FolderDetailResponse>> {
    let folder = state
        .folders
        .update(Requester::from(&user), id, &request, false)
        .await?;
    Ok(Json(folder))
}

/// `PATCH /api/documents/folders/{id}`
pub async fn partial_update(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<FolderRequest>,
) -> AppResult<Json<FolderDetailResponse>> {
    let folder = state
        .folders
        .update(Requester::from(&user), id, &request, true)
        .await?;
    Ok(Json(folder))
}

/// Delete a folder with its subfolders and documents.
///
/// `DELETE /api/documents/folders/{id}`
pub async fn delete(State(state): State<SharedState>, user: AuthUser, IdPath(id): IdPath) -> AppResult<StatusCode> {
    state.folders.delete(Requester::from(&user), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Direct subfolders and documents.
///
/// `GET /api/documents/folders/{id}/contents`
pub async fn contents(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<FolderContentsResponse>> {
    Ok(Json(state.folders.contents(Requester::from(&user), id).await?))
}

/// `POST /api/documents/folders/{id}/share`
///
/// ```json
/// {"user_ids": ["7f1c..."]}
/// ```
pub async fn share(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<ShareRequest>,
) -> AppResult<Json<FolderResponse>> {
    let folder = state
        .folders
        .set_sharing(Requester::from(&user), id, &request.user_ids, true)
        .await?;
    Ok(Json(folder))
}

/// `POST /api/documents/folders/{id}/unshare`
pub async fn unshare(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<ShareRequest>,
) -> AppResult<Json<FolderResponse>> {
    let folder = state
        .folders
        .set_sharing(Requester::from(&user), id, &request.user_ids, false)
        .await?;
    Ok(Json(folder))
}
