use crate::error::RepoResult;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Object kinds that can be shared with individual users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareTarget {
    Folder,
    Document,
}

impl ShareTarget {
    fn table(&self) -> &'static str {
        match self {
            ShareTarget::Folder => "folder_shared_users",
            ShareTarget::Document => "document_shared_users",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ShareTarget::Folder => "folder_id",
            ShareTarget::Document => "document_id",
        }
    }
}

/// Repository for the per-user share sets of folders and documents
pub struct ShareRepository {
    pool: PgPool,
}

impl ShareRepository {
    /// Create a new ShareRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Users an object is shared with
    pub async fn shared_user_ids(&self, target: ShareTarget, object_id: Uuid) -> RepoResult<Vec<Uuid>> {
        let sql = format!(
            "SELECT user_id FROM {} WHERE {} = $1",
            target.table(),
            target.column()
        );
        let ids = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(object_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Remove users from the share set
    pub async fn remove_with(
        conn: &mut PgConnection,
        target: ShareTarget,
        object_id: Uuid,
        user_ids: &[Uuid],
    ) -> RepoResult<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 AND user_id = ANY($2)",
            target.table(),
            target.column()
        );
        let rows_affected = sqlx::query(&sql)
            .bind(object_id)
            .bind(user_ids)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        Ok(rows_affected)
    }

    /// Add users to the share set; already shared users are kept
    pub async fn add_with(
        conn: &mut PgConnection,
        target: ShareTarget,
        object_id: Uuid,
        user_ids: &[Uuid],
    ) -> RepoResult<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "INSERT INTO {} ({}, user_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
            target.table(),
            target.column()
        );
        let rows_affected = sqlx::query(&sql)
            .bind(object_id)
            .bind(user_ids)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        Ok(rows_affected)
    }

    /// Replace the whole share set
    pub async fn set_with(
        conn: &mut PgConnection,
        target: ShareTarget,
        object_id: Uuid,
        user_ids: &[Uuid],
    ) -> RepoResult<()> {
        let sql = format!("DELETE FROM {} WHERE {} = $1", target.table(), target.column());
        sqlx::query(&sql).bind(object_id).execute(&mut *conn).await?;
        Self::add_with(conn, target, object_id, user_ids).await?;
        Ok(())
    }
}
