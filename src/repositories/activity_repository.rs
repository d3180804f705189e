use crate::error::RepoResult;
use crate::models::{ActivityType, DocumentActivity};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const ACTIVITY_COLUMNS: &str = "a.id, a.document_id, a.user_id, a.activity_type, a.description, \
                                a.created_at, a.ip_address";

/// A log entry waiting to be written
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub document_id: Option<Uuid>,
    pub user_id: Uuid,
    pub activity_type: ActivityType,
    pub description: String,
    pub ip_address: Option<String>,
}

/// Which rows a caller may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityScope {
    All,
    OwnedBy(Uuid),
}

/// Activity list query
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub activity_type: Option<ActivityType>,
    pub document_id: Option<Uuid>,
    pub oldest_first: bool,
}

/// Repository for the document activity log
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    /// Create a new ActivityRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, activity: &NewActivity) -> RepoResult<DocumentActivity> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_with(&mut conn, activity).await
    }

    pub async fn insert_with(conn: &mut PgConnection, activity: &NewActivity) -> RepoResult<DocumentActivity> {
        let row = sqlx::query_as::<_, DocumentActivity>(
            r#"
            INSERT INTO document_activities (document_id, user_id, activity_type, description, ip_address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, document_id, user_id, activity_type, description, created_at, ip_address
            "#,
        )
        .bind(activity.document_id)
        .bind(activity.user_id)
        .bind(activity.activity_type.as_str())
        .bind(&activity.description)
        .bind(&activity.ip_address)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Find an activity by UUID within the caller's scope
    pub async fn find_by_id(&self, id: Uuid, scope: ActivityScope) -> RepoResult<Option<DocumentActivity>> {
        let mut builder = Self::scoped_select(scope);
        builder.push(" AND a.id = ");
        builder.push_bind(id);
        let activity = builder
            .build_query_as::<DocumentActivity>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(activity)
    }

    pub async fn list(&self, scope: ActivityScope, filter: &ActivityFilter) -> RepoResult<Vec<DocumentActivity>> {
        let mut builder = Self::scoped_select(scope);
        if let Some(kind) = filter.activity_type {
            builder.push(" AND a.activity_type = ");
            builder.push_bind(kind.as_str());
        }
        if let Some(document_id) = filter.document_id {
            builder.push(" AND a.document_id = ");
            builder.push_bind(document_id);
        }
        if filter.oldest_first {
            builder.push(" ORDER BY a.created_at ASC, a.id");
        } else {
            builder.push(" ORDER BY a.created_at DESC, a.id");
        }

        let activities = builder
            .build_query_as::<DocumentActivity>()
            .fetch_all(&self.pool)
            .await?;
        Ok(activities)
    }

    /// Activity of one document, newest first
    pub async fn for_document(&self, document_id: Uuid) -> RepoResult<Vec<DocumentActivity>> {
        let sql = format!(
            "SELECT {} FROM document_activities a WHERE a.document_id = $1 ORDER BY a.created_at DESC, a.id",
            ACTIVITY_COLUMNS
        );
        let activities = sqlx::query_as::<_, DocumentActivity>(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(activities)
    }

    fn scoped_select(scope: ActivityScope) -> QueryBuilder<'static, Postgres> {
        match scope {
            ActivityScope::All => QueryBuilder::new(format!(
                "SELECT {} FROM document_activities a WHERE TRUE",
                ACTIVITY_COLUMNS
            )),
            ActivityScope::OwnedBy(owner_id) => {
                let mut builder = QueryBuilder::new(format!(
                    "SELECT {} FROM document_activities a JOIN documents d ON d.id = a.document_id WHERE d.owner_id = ",
                    ACTIVITY_COLUMNS
                ));
                builder.push_bind(owner_id);
                builder
            }
        }
    }
}
