//! Tag API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::extract::{IdPath, JsonBody, QueryParams};
use crate::auth::AuthUser;
use crate::dto::TagRequest;
use crate::error::AppResult;
use crate::models::Tag;
use crate::repositories::filters::{parse_ordering, search_terms};
use crate::repositories::tag_repository::TAG_ORDERING_FIELDS;
use crate::repositories::TagFilter;
use crate::SharedState;

/// Query parameters for listing tags.
#[derive(Debug, Deserialize, Default)]
pub struct ListTagsQuery {
    /// Case-insensitive match on the name
    pub search: Option<String>,

    /// `name` or `-name`
    pub ordering: Option<String>,
}

impl ListTagsQuery {
    fn into_filter(self) -> TagFilter {
        TagFilter {
            search: search_terms(self.search.as_deref()),
            ordering: parse_ordering(self.ordering.as_deref(), TAG_ORDERING_FIELDS),
        }
    }
}

/// `GET /api/documents/tags`
pub async fn list(
    State(state): State<SharedState>,
    _user: AuthUser,
    QueryParams(query): QueryParams<ListTagsQuery>,
) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(state.tags.list(&query.into_filter()).await?))
}

/// `POST /api/documents/tags`
///
/// ```json
/// {"name": "Quarterly Reports"}
/// ```
pub async fn create(
    State(state): State<SharedState>,
    _user: AuthUser,
    JsonBody(request): JsonBody<TagRequest>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    let tag = state.tags.create(&request).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `GET /api/documents/tags/{id}`
pub async fn get(State(state): State<SharedState>, _user: AuthUser, IdPath(id): IdPath) -> AppResult<Json<Tag>> {
    Ok(Json(state.tags.get(id).await?))
}

/// `PUT /api/documents/tags/{id}`
pub async fn update(
    State(state): State<SharedState>,
    _user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<TagRequest>,
) -> AppResult<Json<Tag>> {
    Ok(Json(state.tags.update(id, &request, false).await?))
}

/// `PATCH /api/documents/tags/{id}`
pub async fn partial_update(
    State(state): State<SharedState>,
    _user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<TagRequest>,
) -> AppResult<Json<Tag>> {
    Ok(Json(state.tags.update(id, &request, true).await?))
}

/// `DELETE /api/documents/tags/{id}`
pub async fn delete(State(state): State<SharedState>, _user: AuthUser, IdPath(id): IdPath) -> AppResult<StatusCode> {
    state.tags.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
