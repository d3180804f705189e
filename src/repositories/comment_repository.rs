use crate::error::RepoResult;
use crate::models::Comment;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const COMMENT_COLUMNS: &str = "c.id, c.document_id, c.user_id, c.content, c.created_at, c.modified_at, c.parent_id";

/// Repository for document comments
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    /// Create a new CommentRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_with(
        conn: &mut PgConnection,
        document_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> RepoResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (document_id, user_id, content, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, document_id, user_id, content, created_at, modified_at, parent_id
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .bind(content)
        .bind(parent_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(comment)
    }

    /// Find a comment by UUID
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments c WHERE c.id = $1", COMMENT_COLUMNS);
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    /// Comments on documents visible to the user, newest first
    pub async fn list_visible(&self, user_id: Uuid) -> RepoResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments c \
             JOIN documents d ON d.id = c.document_id \
             WHERE d.owner_id = $1 OR d.is_public OR EXISTS ( \
                 SELECT 1 FROM document_shared_users s WHERE s.document_id = d.id AND s.user_id = $1) \
             ORDER BY c.created_at DESC, c.id",
            COMMENT_COLUMNS
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    /// Comments on one document, newest first
    pub async fn for_document(&self, document_id: Uuid) -> RepoResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments c WHERE c.document_id = $1 ORDER BY c.created_at DESC, c.id",
            COMMENT_COLUMNS
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    /// Replace the text and bump `modified_at`
    pub async fn update_content(&self, id: Uuid, content: &str) -> RepoResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = $2, modified_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING id, document_id, user_id, content, created_at, modified_at, parent_id
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    /// Delete a comment and its replies
    pub async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
