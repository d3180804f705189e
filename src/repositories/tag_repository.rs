use super::filters::{push_order_by, push_search, OrderBy};
use crate::error::RepoResult;
use crate::models::Tag;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

/// Orderable tag fields
pub const TAG_ORDERING_FIELDS: &[(&str, &str)] = &[("name", "name")];

/// Tag list query
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub search: Vec<String>,
    pub ordering: Vec<OrderBy>,
}

/// Repository for tag data access
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    /// Create a new TagRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new tag
    pub async fn create(&self, name: &str, slug: &str) -> RepoResult<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug
            "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    /// Find a tag by UUID
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    /// Subset of `ids` that belong to existing tags
    pub async fn existing_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    /// List tags with search and ordering
    pub async fn list(&self, filter: &TagFilter) -> RepoResult<Vec<Tag>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id, name, slug FROM tags WHERE TRUE");
        push_search(&mut builder, &filter.search, &["name"]);
        push_order_by(&mut builder, &filter.ordering, OrderBy::asc("name"), "id");

        let tags = builder.build_query_as::<Tag>().fetch_all(&self.pool).await?;
        Ok(tags)
    }

    /// Rename a tag; the slug is always derived again by the caller
    pub async fn update(&self, id: Uuid, name: &str, slug: &str) -> RepoResult<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags
            SET name = $2, slug = $3
            WHERE id = $1
            RETURNING id, name, slug
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    /// Delete a tag (detaches it from documents)
    pub async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    /// Tags attached to each of the given documents, by name
    pub async fn for_documents(&self, document_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, Vec<Tag>>> {
        let mut by_document: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        if document_ids.is_empty() {
            return Ok(by_document);
        }

        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String)>(
            r#"
            SELECT dt.document_id, t.id, t.name, t.slug
            FROM document_tags dt
            JOIN tags t ON t.id = dt.tag_id
            WHERE dt.document_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(document_ids)
        .fetch_all(&self.pool)
        .await?;

        for (document_id, id, name, slug) in rows {
            by_document
                .entry(document_id)
                .or_default()
                .push(Tag { id, name, slug });
        }
        Ok(by_document)
    }

    /// Replace the tag set of a document
    pub async fn set_for_document(conn: &mut PgConnection, document_id: Uuid, tag_ids: &[Uuid]) -> RepoResult<()> {
        sqlx::query("DELETE FROM document_tags WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *conn)
            .await?;

        if !tag_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO document_tags (document_id, tag_id)
                SELECT $1, UNNEST($2::uuid[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(document_id)
            .bind(tag_ids)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
