use super::access::AccessGuard;
use super::activity_service::{ActivityService, Actor};
use super::storage::MediaStorage;
use super::{user_from, Download};
use crate::dto::VersionResponse;
use crate::error::{AppError, AppResult};
use crate::models::DocumentVersion;
use crate::permissions::Requester;
use crate::repositories::{UserRepository, VersionRepository};
use axum::http::Method;
use std::sync::Arc;
use uuid::Uuid;

const MISSING: &str = "No DocumentVersion matches the given query.";

/// Read-only access to document version history
pub struct VersionService {
    version_repo: Arc<VersionRepository>,
    user_repo: Arc<UserRepository>,
    guard: Arc<AccessGuard>,
    activities: Arc<ActivityService>,
    storage: Arc<MediaStorage>,
}

impl VersionService {
    pub fn new(
        version_repo: Arc<VersionRepository>,
        user_repo: Arc<UserRepository>,
        guard: Arc<AccessGuard>,
        activities: Arc<ActivityService>,
        storage: Arc<MediaStorage>,
    ) -> Self {
        Self {
            version_repo,
            user_repo,
            guard,
            activities,
            storage,
        }
    }

    pub async fn present(&self, versions: Vec<DocumentVersion>) -> AppResult<Vec<VersionResponse>> {
        let creator_ids: Vec<Uuid> = versions.iter().map(|v| v.created_by).collect();
        let users = self.user_repo.minimal_by_id(&creator_ids).await?;

        versions
            .into_iter()
            .map(|v| {
                Ok(VersionResponse {
                    id: v.id,
                    document: v.document_id,
                    file: self.storage.url(&v.file_path),
                    file_size: v.file_size,
                    checksum: v.checksum,
                    version: v.version,
                    created_by: user_from(&users, v.created_by)?,
                    created_at: v.created_at,
                    comment: v.comment,
                })
            })
            .collect()
    }

    /// Versions of all documents visible to the caller
    pub async fn list(&self, requester: Requester) -> AppResult<Vec<VersionResponse>> {
        let versions = self.version_repo.list_visible(requester.id).await?;
        self.present(versions).await
    }

    /// Versions of a document the caller has already been checked against
    pub async fn for_document(&self, document_id: Uuid) -> AppResult<Vec<VersionResponse>> {
        let versions = self.version_repo.list_for_document(document_id).await?;
        self.present(versions).await
    }

    /// Load a version, judging access by its document
    async fn load(&self, requester: Requester, id: Uuid) -> AppResult<DocumentVersion> {
        let version = self
            .version_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(MISSING.to_string()))?;

        match self.guard.document(requester, version.document_id, &Method::GET).await {
            Ok(_) => Ok(version),
            Err(AppError::NotFound(_)) => Err(AppError::NotFound(MISSING.to_string())),
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, requester: Requester, id: Uuid) -> AppResult<VersionResponse> {
        let version = self.load(requester, id).await?;
        let mut presented = self.present(vec![version]).await?;
        presented.pop().ok_or_else(|| AppError::NotFound(MISSING.to_string()))
    }

    /// Serve a version's file as `<stem>_v<n><ext>`
    pub async fn download(&self, actor: &Actor, id: Uuid) -> AppResult<Download> {
        let version = self.load(actor.requester(), id).await?;
        let bytes = self.storage.read(&version.file_path).await?;

        self.activities
            .log_accessed(actor, version.document_id, Some(&version))
            .await?;

        Ok(Download {
            file_name: version.download_name(),
            checksum: version.checksum,
            bytes,
        })
    }
}
