use super::user_from;
use crate::dto::ActivityResponse;
use crate::error::{AppError, AppResult};
use crate::models::{ActivityType, Document, DocumentActivity, DocumentVersion};
use crate::permissions::Requester;
use crate::repositories::{ActivityFilter, ActivityRepository, ActivityScope, NewActivity, UserRepository};
use sqlx::PgConnection;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Who is acting, and from where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub privileged: bool,
    pub ip_address: Option<String>,
}

impl Actor {
    pub fn requester(&self) -> Requester {
        Requester {
            id: self.id,
            privileged: self.privileged,
        }
    }
}

/// Activity log for documents: who did what, when, from which address
pub struct ActivityService {
    activity_repo: Arc<ActivityRepository>,
    user_repo: Arc<UserRepository>,
}

impl ActivityService {
    pub fn new(activity_repo: Arc<ActivityRepository>, user_repo: Arc<UserRepository>) -> Self {
        Self {
            activity_repo,
            user_repo,
        }
    }

    fn entry(actor: &Actor, document_id: Option<Uuid>, kind: ActivityType, description: String) -> NewActivity {
        NewActivity {
            document_id,
            user_id: actor.id,
            activity_type: kind,
            description,
            ip_address: actor.ip_address.clone(),
        }
    }

    /// Write an entry inside the caller's transaction
    pub async fn log_with(
        conn: &mut PgConnection,
        actor: &Actor,
        document_id: Option<Uuid>,
        kind: ActivityType,
        description: String,
    ) -> AppResult<DocumentActivity> {
        let entry = Self::entry(actor, document_id, kind, description);
        let activity = ActivityRepository::insert_with(conn, &entry).await?;
        info!(
            activity = %kind,
            user_id = %actor.id,
            document_id = ?document_id,
            "{}",
            activity.description
        );
        Ok(activity)
    }

    /// Write an entry on its own connection
    pub async fn log(
        &self,
        actor: &Actor,
        document_id: Option<Uuid>,
        kind: ActivityType,
        description: String,
    ) -> AppResult<DocumentActivity> {
        let entry = Self::entry(actor, document_id, kind, description);
        let activity = self.activity_repo.insert(&entry).await?;
        info!(
            activity = %kind,
            user_id = %actor.id,
            document_id = ?document_id,
            "{}",
            activity.description
        );
        Ok(activity)
    }

    /// Log document creation
    pub async fn log_created_with(conn: &mut PgConnection, actor: &Actor, document: &Document) -> AppResult<()> {
        Self::log_with(conn, actor, Some(document.id), ActivityType::Created, "Document created".into()).await?;
        Ok(())
    }

    /// Log a new file version
    pub async fn log_updated_with(conn: &mut PgConnection, actor: &Actor, document: &Document) -> AppResult<()> {
        let description = format!("Updated to version {}", document.version);
        Self::log_with(conn, actor, Some(document.id), ActivityType::Updated, description).await?;
        Ok(())
    }

    /// Log deletion; the entry outlives the document so it is not linked to it
    pub async fn log_deleted_with(conn: &mut PgConnection, actor: &Actor, document: &Document) -> AppResult<()> {
        let description = format!("Deleted document: {}", document.title);
        Self::log_with(conn, actor, None, ActivityType::Deleted, description).await?;
        Ok(())
    }

    pub async fn log_commented_with(conn: &mut PgConnection, actor: &Actor, document_id: Uuid) -> AppResult<()> {
        Self::log_with(conn, actor, Some(document_id), ActivityType::Commented, "Added a comment".into()).await?;
        Ok(())
    }

    /// Log a download of the current file or of a given version
    pub async fn log_accessed(&self, actor: &Actor, document_id: Uuid, version: Option<&DocumentVersion>) -> AppResult<()> {
        let description = match version {
            Some(v) => format!("Downloaded document version {}", v.version),
            None => "Downloaded document".to_string(),
        };
        self.log(actor, Some(document_id), ActivityType::Accessed, description).await?;
        Ok(())
    }

    /// Log a share or unshare of `count` users
    pub async fn log_sharing_with(
        conn: &mut PgConnection,
        actor: &Actor,
        document_id: Uuid,
        shared: bool,
        count: usize,
    ) -> AppResult<()> {
        let (kind, description) = if shared {
            (ActivityType::Shared, format!("Shared with {} users", count))
        } else {
            (ActivityType::Unshared, format!("Unshared from {} users", count))
        };
        Self::log_with(conn, actor, Some(document_id), kind, description).await?;
        Ok(())
    }

    fn scope(requester: Requester) -> ActivityScope {
        if requester.privileged {
            ActivityScope::All
        } else {
            ActivityScope::OwnedBy(requester.id)
        }
    }

    /// Activities readable by the caller
    pub async fn list(&self, requester: Requester, filter: &ActivityFilter) -> AppResult<Vec<ActivityResponse>> {
        let activities = self.activity_repo.list(Self::scope(requester), filter).await?;
        self.to_responses(activities).await
    }

    pub async fn get(&self, requester: Requester, id: Uuid) -> AppResult<ActivityResponse> {
        let activity = self
            .activity_repo
            .find_by_id(id, Self::scope(requester))
            .await?
            .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

        let mut responses = self.to_responses(vec![activity]).await?;
        responses
            .pop()
            .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))
    }

    /// Full history of one document, for the document detail view
    pub async fn for_document(&self, document_id: Uuid) -> AppResult<Vec<ActivityResponse>> {
        let activities = self.activity_repo.for_document(document_id).await?;
        self.to_responses(activities).await
    }

    async fn to_responses(&self, activities: Vec<DocumentActivity>) -> AppResult<Vec<ActivityResponse>> {
        let user_ids: Vec<Uuid> = activities.iter().map(|a| a.user_id).collect();
        let users = self.user_repo.minimal_by_id(&user_ids).await?;

        let mut responses = Vec::with_capacity(activities.len());
        for activity in activities {
            responses.push(ActivityResponse {
                id: activity.id,
                document: activity.document_id,
                user: user_from(&users, activity.user_id)?,
                activity_type: activity.activity_type,
                description: activity.description,
                created_at: activity.created_at,
                ip_address: activity.ip_address,
            });
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_carries_actor_address() {
        let actor = Actor {
            id: Uuid::new_v4(),
            privileged: false,
            ip_address: Some("203.0.113.7".into()),
        };
        let entry = ActivityService::entry(&actor, None, ActivityType::Deleted, "Deleted document: x".into());
        assert_eq!(entry.user_id, actor.id);
        assert_eq!(entry.document_id, None);
        assert_eq!(entry.ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_scope_follows_privilege() {
        let id = Uuid::new_v4();
        let admin = Requester { id, privileged: true };
        let member = Requester { id, privileged: false };
        assert_eq!(ActivityService::scope(admin), ActivityScope::All);
        assert_eq!(ActivityService::scope(member), ActivityScope::OwnedBy(id));
    }
}
