use crate::error::RepoResult;
use crate::models::DocumentVersion;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const VERSION_COLUMNS: &str = "v.id, v.document_id, v.file_path, v.file_size, v.checksum, v.version, \
                               v.created_by, v.created_at, v.comment";

/// Values for a new version row
#[derive(Debug, Clone)]
pub struct NewVersion<'a> {
    pub document_id: Uuid,
    pub file_path: &'a str,
    pub file_size: i64,
    pub checksum: &'a str,
    pub version: i32,
    pub created_by: Uuid,
    pub comment: &'a str,
}

/// Repository for document version history
pub struct VersionRepository {
    pool: PgPool,
}

impl VersionRepository {
    /// Create a new VersionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_with(conn: &mut PgConnection, new: NewVersion<'_>) -> RepoResult<DocumentVersion> {
        let version = sqlx::query_as::<_, DocumentVersion>(
            r#"
            INSERT INTO document_versions
                (document_id, file_path, file_size, checksum, version, created_by, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, document_id, file_path, file_size, checksum, version,
                      created_by, created_at, comment
            "#,
        )
        .bind(new.document_id)
        .bind(new.file_path)
        .bind(new.file_size)
        .bind(new.checksum)
        .bind(new.version)
        .bind(new.created_by)
        .bind(new.comment)
        .fetch_one(&mut *conn)
        .await?;
        Ok(version)
    }

    /// Find a version by UUID
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<DocumentVersion>> {
        let sql = format!("SELECT {} FROM document_versions v WHERE v.id = $1", VERSION_COLUMNS);
        let version = sqlx::query_as::<_, DocumentVersion>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }

    /// Versions of one document, newest first
    pub async fn list_for_document(&self, document_id: Uuid) -> RepoResult<Vec<DocumentVersion>> {
        let sql = format!(
            "SELECT {} FROM document_versions v WHERE v.document_id = $1 ORDER BY v.version DESC",
            VERSION_COLUMNS
        );
        let versions = sqlx::query_as::<_, DocumentVersion>(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(versions)
    }

    /// Versions of every document visible to the user, newest first
    pub async fn list_visible(&self, user_id: Uuid) -> RepoResult<Vec<DocumentVersion>> {
        let sql = format!(
            "SELECT {} FROM document_versions v \
             JOIN documents d ON d.id = v.document_id \
             WHERE d.owner_id = $1 OR d.is_public OR EXISTS ( \
                 SELECT 1 FROM document_shared_users s WHERE s.document_id = d.id AND s.user_id = $1) \
             ORDER BY v.version DESC, v.created_at DESC",
            VERSION_COLUMNS
        );
        let versions = sqlx::query_as::<_, DocumentVersion>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(versions)
    }
}
