use super::filters::{push_order_by, push_search, OrderBy};
use crate::error::RepoResult;
use crate::models::Document;
use crate::services::storage::StoredFile;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "d.id, d.title, d.description, d.file_path, d.file_type, d.file_size, \
                                d.checksum, d.folder_id, d.owner_id, d.is_public, d.version, \
                                d.created_at, d.modified_at";

const RETURNING_DOCUMENT: &str = "RETURNING id, title, description, file_path, file_type, file_size, \
                                  checksum, folder_id, owner_id, is_public, version, created_at, modified_at";

/// Orderable document fields
pub const DOCUMENT_ORDERING_FIELDS: &[(&str, &str)] = &[
    ("title", "d.title"),
    ("created_at", "d.created_at"),
    ("modified_at", "d.modified_at"),
    ("file_size", "d.file_size"),
];

/// Document list query
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub is_public: Option<bool>,
    pub folder_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    pub search: Vec<String>,
    pub ordering: Vec<OrderBy>,
}

/// Metadata columns editable after creation
#[derive(Debug, Clone)]
pub struct DocumentFields {
    pub title: String,
    pub description: String,
    pub folder_id: Option<Uuid>,
    pub is_public: bool,
}

/// Repository for document data access
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    /// Create a new DocumentRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a document at version 1
    pub async fn insert_with(
        conn: &mut PgConnection,
        owner_id: Uuid,
        fields: &DocumentFields,
        file: &StoredFile,
        file_type: &str,
    ) -> RepoResult<Document> {
        let sql = format!(
            "INSERT INTO documents \
             (title, description, file_path, file_type, file_size, checksum, folder_id, owner_id, is_public, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1) {}",
            RETURNING_DOCUMENT
        );
        let document = sqlx::query_as::<_, Document>(&sql)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&file.path)
            .bind(file_type)
            .bind(file.size)
            .bind(&file.checksum)
            .bind(fields.folder_id)
            .bind(owner_id)
            .bind(fields.is_public)
            .fetch_one(&mut *conn)
            .await?;
        Ok(document)
    }

    /// Find a document by UUID
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Document>> {
        let sql = format!("SELECT {} FROM documents d WHERE d.id = $1", DOCUMENT_COLUMNS);
        let document = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    /// Lock a document row for the rest of the transaction
    pub async fn lock_with(conn: &mut PgConnection, id: Uuid) -> RepoResult<Option<Document>> {
        let sql = format!("SELECT {} FROM documents d WHERE d.id = $1 FOR UPDATE", DOCUMENT_COLUMNS);
        let document = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(document)
    }

    /// Documents owned by, shared with, or public to the user
    pub async fn list_visible(&self, user_id: Uuid, filter: &DocumentFilter) -> RepoResult<Vec<Document>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM documents d WHERE (d.owner_id = ",
            DOCUMENT_COLUMNS
        ));
        builder.push_bind(user_id);
        builder.push(" OR d.is_public OR EXISTS (SELECT 1 FROM document_shared_users s WHERE s.document_id = d.id AND s.user_id = ");
        builder.push_bind(user_id);
        builder.push("))");

        if let Some(is_public) = filter.is_public {
            builder.push(" AND d.is_public = ");
            builder.push_bind(is_public);
        }
        if let Some(folder_id) = filter.folder_id {
            builder.push(" AND d.folder_id = ");
            builder.push_bind(folder_id);
        }
        if let Some(tag_id) = filter.tag_id {
            builder.push(" AND EXISTS (SELECT 1 FROM document_tags dt WHERE dt.document_id = d.id AND dt.tag_id = ");
            builder.push_bind(tag_id);
            builder.push(")");
        }
        push_search(&mut builder, &filter.search, &["d.title", "d.description", "d.file_type"]);
        push_order_by(&mut builder, &filter.ordering, OrderBy::desc("d.modified_at"), "d.id");

        let documents = builder.build_query_as::<Document>().fetch_all(&self.pool).await?;
        Ok(documents)
    }

    /// Documents directly inside a folder
    pub async fn in_folder(&self, folder_id: Uuid) -> RepoResult<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM documents d WHERE d.folder_id = $1 ORDER BY d.modified_at DESC, d.id",
            DOCUMENT_COLUMNS
        );
        let documents = sqlx::query_as::<_, Document>(&sql)
            .bind(folder_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(documents)
    }

    /// Overwrite metadata and bump `modified_at`
    pub async fn update_fields_with(conn: &mut PgConnection, id: Uuid, fields: &DocumentFields) -> RepoResult<Document> {
        let sql = format!(
            "UPDATE documents \
             SET title = $2, description = $3, folder_id = $4, is_public = $5, \
                 modified_at = (NOW() AT TIME ZONE 'utc') \
             WHERE id = $1 {}",
            RETURNING_DOCUMENT
        );
        let document = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(fields.folder_id)
            .bind(fields.is_public)
            .fetch_one(&mut *conn)
            .await?;
        Ok(document)
    }

    /// Point the document at a new file and increment its version
    pub async fn replace_file_with(
        conn: &mut PgConnection,
        id: Uuid,
        file: &StoredFile,
        file_type: &str,
    ) -> RepoResult<Document> {
        let sql = format!(
            "UPDATE documents \
             SET file_path = $2, file_type = $3, file_size = $4, checksum = $5, \
                 version = version + 1, modified_at = (NOW() AT TIME ZONE 'utc') \
             WHERE id = $1 {}",
            RETURNING_DOCUMENT
        );
        let document = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .bind(&file.path)
            .bind(file_type)
            .bind(file.size)
            .bind(&file.checksum)
            .fetch_one(&mut *conn)
            .await?;
        Ok(document)
    }

    /// Delete a document (cascades to versions, comments, tags and shares)
    pub async fn delete_with(conn: &mut PgConnection, id: Uuid) -> RepoResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    /// Every stored file referenced by a document or its versions
    pub async fn file_paths_with(conn: &mut PgConnection, id: Uuid) -> RepoResult<Vec<String>> {
        let paths = sqlx::query_scalar::<_, String>(
            r#"
            SELECT file_path FROM documents WHERE id = $1
            UNION
            SELECT file_path FROM document_versions WHERE document_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(paths)
    }

    /// Lock the documents filed in any of the folders; returns their ids
    pub async fn lock_in_folders_with(conn: &mut PgConnection, folder_ids: &[Uuid]) -> RepoResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM documents WHERE folder_id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(folder_ids)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids)
    }

    /// Every stored file of the documents filed in any of the folders
    pub async fn file_paths_in_folders_with(conn: &mut PgConnection, folder_ids: &[Uuid]) -> RepoResult<Vec<String>> {
        let paths = sqlx::query_scalar::<_, String>(
            r#"
            SELECT d.file_path FROM documents d WHERE d.folder_id = ANY($1)
            UNION
            SELECT v.file_path
            FROM document_versions v
            JOIN documents d ON d.id = v.document_id
            WHERE d.folder_id = ANY($1)
            "#,
        )
        .bind(folder_ids)
        .fetch_all(&mut *conn)
        .await?;
        Ok(paths)
    }
}
