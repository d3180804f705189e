//! Document API handlers.
//!
//! Create and update accept either `multipart/form-data` (with a `file`
//! part) or a JSON body without a file.

use axum::{extract::State, http::StatusCode, response::Response, Json};
use serde::Deserialize;

use super::attachment;
use super::extract::{query_bool, query_id, DocumentForm, IdPath, JsonBody, QueryParams};
use crate::auth::AuthUser;
use crate::dto::{
    CommentResponse, DocumentCommentRequest, DocumentDetailResponse, DocumentResponse, ShareRequest,
    VersionResponse,
};
use crate::error::AppResult;
use crate::permissions::Requester;
use crate::repositories::document_repository::DOCUMENT_ORDERING_FIELDS;
use crate::repositories::filters::{parse_ordering, search_terms};
use crate::repositories::DocumentFilter;
use crate::services::Actor;
use crate::SharedState;

/// Query parameters for listing documents.
#[derive(Debug, Deserialize, Default)]
pub struct ListDocumentsQuery {
    pub is_public: Option<String>,

    /// Folder id
    pub folder: Option<String>,

    /// Tag id
    pub tags: Option<String>,

    /// Terms matched against title, description and file type
    pub search: Option<String>,

    /// Comma separated `title`, `created_at`, `modified_at`, `file_size`
    pub ordering: Option<String>,
}

impl ListDocumentsQuery {
    fn into_filter(self) -> AppResult<DocumentFilter> {
        Ok(DocumentFilter {
            is_public: query_bool("is_public", self.is_public.as_deref())?,
            folder_id: query_id("folder", self.folder.as_deref())?,
            tag_id: query_id("tags", self.tags.as_deref())?,
            search: search_terms(self.search.as_deref()),
            ordering: parse_ordering(self.ordering.as_deref(), DOCUMENT_ORDERING_FIELDS),
        })
    }
}

/// Documents the caller owns, was shared, or that are public.
///
/// `GET /api/documents`
///
/// # Query Parameters
///
/// - `is_public`, `folder`, `tags`: exact filters
/// - `search`: whitespace or comma separated terms, all must match
/// - `ordering`: e.g. `-file_size,title`
pub async fn list(
    State(state): State<SharedState>,
    user: AuthUser,
    QueryParams(query): QueryParams<ListDocumentsQuery>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let documents = state
        .documents
        .list(Requester::from(&user), &query.into_filter()?)
        .await?;
    Ok(Json(documents))
}

/// Upload a document.
///
/// `POST /api/documents`
///
/// Multipart fields: `title`, `description`, `file`, `folder_id`,
/// `tag_ids` (repeated or comma separated), `is_public`.
pub async fn create(
    State(state): State<SharedState>,
    actor: Actor,
    DocumentForm(input): DocumentForm,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let document = state.documents.create(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Document with versions, comments, activities and shared users.
///
/// `GET /api/documents/{id}`
pub async fn get(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<DocumentDetailResponse>> {
    Ok(Json(state.documents.get(Requester::from(&user), id).await?))
}

/// `PUT /api/documents/{id}`
///
/// A new `file` creates the next version.
pub async fn update(
    State(state): State<SharedState>,
    actor: Actor,
    IdPath(id): IdPath,
    DocumentForm(input): DocumentForm,
) -> AppResult<Json<DocumentDetailResponse>> {
    Ok(Json(state.documents.update(&actor, id, input, false).await?))
}

/// `PATCH /api/documents/{id}`
pub async fn partial_update(
    State(state): State<SharedState>,
    actor: Actor,
    IdPath(id): IdPath,
    DocumentForm(input): DocumentForm,
) -> AppResult<Json<DocumentDetailResponse>> {
    Ok(Json(state.documents.update(&actor, id, input, true).await?))
}

/// `DELETE /api/documents/{id}`
pub async fn delete(State(state): State<SharedState>, actor: Actor, IdPath(id): IdPath) -> AppResult<StatusCode> {
    state.documents.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current file as an attachment.
///
/// `GET /api/documents/{id}/download`
pub async fn download(State(state): State<SharedState>, actor: Actor, IdPath(id): IdPath) -> AppResult<Response> {
    let file = state.documents.download(&actor, id).await?;
    attachment(file)
}

/// `GET /api/documents/{id}/versions`
pub async fn versions(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<Vec<VersionResponse>>> {
    Ok(Json(state.documents.versions(Requester::from(&user), id).await?))
}

/// `POST /api/documents/{id}/share`
///
/// ```json
/// {"user_ids": ["7f1c..."]}
/// ```
pub async fn share(
    State(state): State<SharedState>,
    actor: Actor,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<ShareRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let document = state
        .documents
        .set_sharing(&actor, id, &request.user_ids, true)
        .await?;
    Ok(Json(document))
}

/// `POST /api/documents/{id}/unshare`
pub async fn unshare(
    State(state): State<SharedState>,
    actor: Actor,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<ShareRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let document = state
        .documents
        .set_sharing(&actor, id, &request.user_ids, false)
        .await?;
    Ok(Json(document))
}

/// `GET /api/documents/{id}/comments`
pub async fn comments(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<Vec<CommentResponse>>> {
    Ok(Json(state.documents.comments(Requester::from(&user), id).await?))
}

/// Comment on a readable document.
///
/// `POST /api/documents/{id}/comments`
///
/// ```json
/// {"content": "Looks good", "parent_id": null}
/// ```
pub async fn add_comment(
    State(state): State<SharedState>,
    actor: Actor,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<DocumentCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let comment = state
        .documents
        .add_comment(&actor, id, &request.content, request.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_document_filter_accepts_form_style_values() {
        let folder = Uuid::new_v4();
        let query = ListDocumentsQuery {
            is_public: Some("True".into()),
            folder: Some(folder.to_string()),
            tags: Some(String::new()),
            ..ListDocumentsQuery::default()
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.is_public, Some(true));
        assert_eq!(filter.folder_id, Some(folder));
        assert_eq!(filter.tag_id, None);

        let query = ListDocumentsQuery {
            is_public: Some("1".into()),
            folder: Some("".into()),
            ..ListDocumentsQuery::default()
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.is_public, Some(true));
        assert_eq!(filter.folder_id, None);
    }

    #[test]
    fn test_document_filter_rejects_bad_ids() {
        let query = ListDocumentsQuery {
            folder: Some("not-a-uuid".into()),
            ..ListDocumentsQuery::default()
        };
        let err = query.into_filter().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
