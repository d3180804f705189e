use crate::error::RepoResult;
use crate::models::{User, UserMinimal};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
                            is_staff, is_admin, is_active, date_joined";

/// Fields required to register a user
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

/// Repository for user data access
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user
    pub async fn create(&self, user: NewUser<'_>) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.username)
            .bind(user.email)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.password_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// Find a user by UUID
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Find a user by username (exact match)
    pub async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Minimal projections for a set of users, in no particular order
    pub async fn find_minimal(&self, ids: &[Uuid]) -> RepoResult<Vec<UserMinimal>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, UserMinimal>(
            r#"
            SELECT id, username, email, first_name, last_name
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Minimal projections keyed by id
    pub async fn minimal_by_id(&self, ids: &[Uuid]) -> RepoResult<HashMap<Uuid, UserMinimal>> {
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        let users = self.find_minimal(&unique).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    /// All active users, by username
    pub async fn list_minimal(&self) -> RepoResult<Vec<UserMinimal>> {
        let users = sqlx::query_as::<_, UserMinimal>(
            r#"
            SELECT id, username, email, first_name, last_name
            FROM users
            WHERE is_active
            ORDER BY username ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Subset of `ids` that belong to existing users
    pub async fn existing_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    /// Grant or revoke staff/admin flags
    pub async fn set_privileges(&self, id: Uuid, is_staff: bool, is_admin: bool) -> RepoResult<User> {
        let sql = format!(
            "UPDATE users SET is_staff = $2, is_admin = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(is_staff)
            .bind(is_admin)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    /// Enable or disable login for a user
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> RepoResult<bool> {
        let rows_affected = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
