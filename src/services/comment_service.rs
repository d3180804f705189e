use super::access::AccessGuard;
use super::activity_service::{ActivityService, Actor};
use super::user_from;
use crate::dto::{CommentResponse, CommentUpdateRequest};
use crate::error::{AppError, AppResult};
use crate::models::Comment;
use crate::permissions::{self, Requester};
use crate::repositories::{CommentRepository, UserRepository};
use axum::http::Method;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const MISSING: &str = "No Comment matches the given query.";

fn validated_content(raw: &str) -> AppResult<&str> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::Validation("content: This field may not be blank.".into()));
    }
    Ok(content)
}

/// Threaded comments on documents
pub struct CommentService {
    pool: PgPool,
    comment_repo: Arc<CommentRepository>,
    user_repo: Arc<UserRepository>,
    guard: Arc<AccessGuard>,
}

impl CommentService {
    pub fn new(
        pool: PgPool,
        comment_repo: Arc<CommentRepository>,
        user_repo: Arc<UserRepository>,
        guard: Arc<AccessGuard>,
    ) -> Self {
        Self {
            pool,
            comment_repo,
            user_repo,
            guard,
        }
    }

    pub async fn present(&self, comments: Vec<Comment>) -> AppResult<Vec<CommentResponse>> {
        let author_ids: Vec<Uuid> = comments.iter().map(|c| c.user_id).collect();
        let users = self.user_repo.minimal_by_id(&author_ids).await?;

        comments
            .into_iter()
            .map(|c| {
                Ok(CommentResponse {
                    id: c.id,
                    document: c.document_id,
                    user: user_from(&users, c.user_id)?,
                    content: c.content,
                    created_at: c.created_at,
                    modified_at: c.modified_at,
                    parent: c.parent_id,
                })
            })
            .collect()
    }

    async fn present_one(&self, comment: Comment) -> AppResult<CommentResponse> {
        let mut presented = self.present(vec![comment]).await?;
        presented.pop().ok_or_else(|| AppError::NotFound(MISSING.to_string()))
    }

    /// Comments on documents visible to the caller, newest first
    pub async fn list(&self, requester: Requester) -> AppResult<Vec<CommentResponse>> {
        let comments = self.comment_repo.list_visible(requester.id).await?;
        self.present(comments).await
    }

    /// Comments of a document the caller has already been checked against
    pub async fn for_document(&self, document_id: Uuid) -> AppResult<Vec<CommentResponse>> {
        let comments = self.comment_repo.for_document(document_id).await?;
        self.present(comments).await
    }

    /// Load a comment on a document visible to the caller
    async fn load(&self, requester: Requester, id: Uuid) -> AppResult<Comment> {
        let comment = self
            .comment_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(MISSING.to_string()))?;

        match self.guard.document(requester, comment.document_id, &Method::GET).await {
            Ok(_) => Ok(comment),
            Err(AppError::NotFound(_)) => Err(AppError::NotFound(MISSING.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Replies must stay within one document
    async fn check_parent(&self, document_id: Uuid, parent_id: Option<Uuid>) -> AppResult<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        match self.comment_repo.find_by_id(parent_id).await? {
            Some(parent) if parent.document_id == document_id => Ok(()),
            Some(_) => Err(AppError::Validation(
                "parent_id: Parent comment belongs to a different document.".into(),
            )),
            None => Err(AppError::Validation(format!(
                "parent_id: Invalid pk \"{}\" - object does not exist.",
                parent_id
            ))),
        }
    }

    pub async fn get(&self, requester: Requester, id: Uuid) -> AppResult<CommentResponse> {
        let comment = self.load(requester, id).await?;
        self.present_one(comment).await
    }

    /// `POST /api/documents/comments`: the document must be visible to the caller
    pub async fn create(
        &self,
        actor: &Actor,
        document_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<CommentResponse> {
        let document = match self.guard.document(actor.requester(), document_id, &Method::GET).await {
            Ok(guarded) => guarded.object,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Validation(format!(
                    "document: Invalid pk \"{}\" - object does not exist.",
                    document_id
                )))
            }
            Err(e) => return Err(e),
        };
        self.insert(actor, document.id, content, parent_id, false).await
    }

    /// Comment through a document's `comments` action; logged as activity
    pub async fn add_to_document(
        &self,
        actor: &Actor,
        document_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<CommentResponse> {
        self.insert(actor, document_id, content, parent_id, true).await
    }

    async fn insert(
        &self,
        actor: &Actor,
        document_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
        log_activity: bool,
    ) -> AppResult<CommentResponse> {
        let content = validated_content(content)?;
        self.check_parent(document_id, parent_id).await?;

        let mut tx = self.pool.begin().await?;
        let comment = CommentRepository::insert_with(&mut *tx, document_id, actor.id, content, parent_id).await?;
        if log_activity {
            ActivityService::log_commented_with(&mut *tx, actor, document_id).await?;
        }
        tx.commit().await?;

        info!("User {} commented on document {}", actor.id, document_id);
        self.present_one(comment).await
    }

    /// Author or staff/admin only; PUT requires content
    pub async fn update(
        &self,
        requester: Requester,
        id: Uuid,
        request: &CommentUpdateRequest,
        partial: bool,
    ) -> AppResult<CommentResponse> {
        let comment = self.load(requester, id).await?;
        permissions::require(permissions::is_owner_or_admin(requester, comment.user_id, &Method::PUT))?;

        let content = match (request.content.as_deref(), partial) {
            (Some(content), _) => validated_content(content)?,
            (None, true) => return self.present_one(comment).await,
            (None, false) => return Err(AppError::Validation("content: This field is required.".into())),
        };

        let updated = self.comment_repo.update_content(id, content).await?;
        self.present_one(updated).await
    }

    pub async fn delete(&self, requester: Requester, id: Uuid) -> AppResult<()> {
        let comment = self.load(requester, id).await?;
        permissions::require(permissions::is_owner_or_admin(requester, comment.user_id, &Method::DELETE))?;

        self.comment_repo.delete(id).await?;
        info!("Deleted comment {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_content() {
        assert_eq!(validated_content("  looks good \n").unwrap(), "looks good");
        assert!(validated_content(" \t\n").is_err());
    }
}
