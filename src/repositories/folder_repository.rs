use super::filters::{push_order_by, push_search, OrderBy};
use crate::error::RepoResult;
use crate::models::Folder;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

/// Advisory lock serializing parent changes across the folder tree
const FOLDER_TREE_LOCK_KEY: i64 = 0x646f_6376_6175_6c74;

const FOLDER_COLUMNS: &str = "f.id, f.name, f.description, f.parent_id, f.owner_id, f.is_public, \
                              f.created_at, f.modified_at";

/// Orderable folder fields
pub const FOLDER_ORDERING_FIELDS: &[(&str, &str)] = &[
    ("name", "f.name"),
    ("created_at", "f.created_at"),
    ("modified_at", "f.modified_at"),
];

/// Folder list query
#[derive(Debug, Clone, Default)]
pub struct FolderFilter {
    pub is_public: Option<bool>,
    pub parent_id: Option<Uuid>,
    pub search: Vec<String>,
    pub ordering: Vec<OrderBy>,
}

/// Values written on insert or update
#[derive(Debug, Clone)]
pub struct FolderFields {
    pub name: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    pub is_public: bool,
}

/// Repository for folder data access
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new FolderRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new folder
    pub async fn create(&self, owner_id: Uuid, fields: &FolderFields) -> RepoResult<Folder> {
        let folder = sqlx::query_as::<_, Folder>(
            r#"
            INSERT INTO folders (name, description, parent_id, owner_id, is_public)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, parent_id, owner_id, is_public, created_at, modified_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.parent_id)
        .bind(owner_id)
        .bind(fields.is_public)
        .fetch_one(&self.pool)
        .await?;
        Ok(folder)
    }

    /// Find a folder by UUID
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Folder>> {
        let sql = format!("SELECT {} FROM folders f WHERE f.id = $1", FOLDER_COLUMNS);
        let folder = sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(folder)
    }

    /// Folders owned by, shared with, or public to the user
    pub async fn list_visible(&self, user_id: Uuid, filter: &FolderFilter) -> RepoResult<Vec<Folder>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM folders f WHERE (f.owner_id = ",
            FOLDER_COLUMNS
        ));
        builder.push_bind(user_id);
        builder.push(" OR f.is_public OR EXISTS (SELECT 1 FROM folder_shared_users s WHERE s.folder_id = f.id AND s.user_id = ");
        builder.push_bind(user_id);
        builder.push("))");

        if let Some(is_public) = filter.is_public {
            builder.push(" AND f.is_public = ");
            builder.push_bind(is_public);
        }
        if let Some(parent_id) = filter.parent_id {
            builder.push(" AND f.parent_id = ");
            builder.push_bind(parent_id);
        }
        push_search(&mut builder, &filter.search, &["f.name", "f.description"]);
        push_order_by(&mut builder, &filter.ordering, OrderBy::desc("f.modified_at"), "f.id");

        let folders = builder.build_query_as::<Folder>().fetch_all(&self.pool).await?;
        Ok(folders)
    }

    /// Direct subfolders, most recently modified first
    pub async fn children(&self, parent_id: Uuid) -> RepoResult<Vec<Folder>> {
        let sql = format!(
            "SELECT {} FROM folders f WHERE f.parent_id = $1 ORDER BY f.modified_at DESC, f.id",
            FOLDER_COLUMNS
        );
        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(folders)
    }

    /// Overwrite the editable fields and bump `modified_at`
    pub async fn update_with(conn: &mut PgConnection, id: Uuid, fields: &FolderFields) -> RepoResult<Folder> {
        let folder = sqlx::query_as::<_, Folder>(
            r#"
            UPDATE folders
            SET name = $2,
                description = $3,
                parent_id = $4,
                is_public = $5,
                modified_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING id, name, description, parent_id, owner_id, is_public, created_at, modified_at
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.parent_id)
        .bind(fields.is_public)
        .fetch_one(&mut *conn)
        .await?;
        Ok(folder)
    }

    /// Delete a folder (cascades to subfolders and their documents)
    pub async fn delete_with(conn: &mut PgConnection, id: Uuid) -> RepoResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    /// Lock a folder and all of its descendants; returns their ids
    pub async fn lock_subtree_with(conn: &mut PgConnection, folder_id: Uuid) -> RepoResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id FROM folders WHERE id = $1
                UNION
                SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id
            )
            SELECT f.id FROM folders f WHERE f.id IN (SELECT id FROM subtree) ORDER BY f.id FOR UPDATE
            "#,
        )
        .bind(folder_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids)
    }

    /// Hold the tree lock until the transaction ends
    pub async fn lock_tree_with(conn: &mut PgConnection) -> RepoResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(FOLDER_TREE_LOCK_KEY)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Whether `candidate` is `folder_id` itself or lies in its subtree
    pub async fn is_in_subtree_with(conn: &mut PgConnection, folder_id: Uuid, candidate: Uuid) -> RepoResult<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id FROM folders WHERE id = $1
                UNION
                SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id
            )
            SELECT EXISTS (SELECT 1 FROM subtree WHERE id = $2)
            "#,
        )
        .bind(folder_id)
        .bind(candidate)
        .fetch_one(&mut *conn)
        .await?;
        Ok(found)
    }

    /// Full `/`-joined path from the root for each folder
    pub async fn full_paths(&self, ids: &[Uuid]) -> RepoResult<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            WITH RECURSIVE chain AS (
                SELECT id AS folder_id, parent_id, name::text AS path, 0 AS depth
                FROM folders
                WHERE id = ANY($1)
                UNION ALL
                SELECT c.folder_id, p.parent_id, p.name || '/' || c.path, c.depth + 1
                FROM chain c
                JOIN folders p ON p.id = c.parent_id
                WHERE c.depth < 256
            )
            SELECT folder_id, path FROM chain WHERE parent_id IS NULL
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
