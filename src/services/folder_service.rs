use super::access::AccessGuard;
use super::document_service::DocumentService;
use super::storage::MediaStorage;
use super::user_from;
use crate::dto::{FolderContentsResponse, FolderDetailResponse, FolderRequest, FolderResponse};
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{Folder, UserMinimal};
use crate::permissions::Requester;
use crate::repositories::{
    DocumentRepository, FolderFields, FolderFilter, FolderRepository, ShareRepository, ShareTarget,
    UserRepository,
};
use axum::http::Method;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const FOLDER_NAME_MAX_LEN: usize = 255;

fn validated_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name: This field may not be blank.".into()));
    }
    if name.chars().count() > FOLDER_NAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "name: Ensure this field has no more than {} characters.",
            FOLDER_NAME_MAX_LEN
        )));
    }
    if name.contains('/') {
        return Err(AppError::Validation("name: Folder names may not contain '/'.".into()));
    }
    Ok(name.to_string())
}

fn duplicate_to_conflict(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::Duplicate(_) => AppError::Conflict(
            "The fields name, parent, owner must make a unique set.".into(),
        ),
        other => other.into(),
    }
}

/// Folder tree management and sharing
pub struct FolderService {
    pool: PgPool,
    folder_repo: Arc<FolderRepository>,
    share_repo: Arc<ShareRepository>,
    user_repo: Arc<UserRepository>,
    guard: Arc<AccessGuard>,
    documents: Arc<DocumentService>,
    storage: Arc<MediaStorage>,
}

impl FolderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        folder_repo: Arc<FolderRepository>,
        share_repo: Arc<ShareRepository>,
        user_repo: Arc<UserRepository>,
        guard: Arc<AccessGuard>,
        documents: Arc<DocumentService>,
        storage: Arc<MediaStorage>,
    ) -> Self {
        Self {
            pool,
            folder_repo,
            share_repo,
            user_repo,
            guard,
            documents,
            storage,
        }
    }

    pub async fn present(&self, folders: Vec<Folder>) -> AppResult<Vec<FolderResponse>> {
        let ids: Vec<Uuid> = folders.iter().map(|f| f.id).collect();
        let owner_ids: Vec<Uuid> = folders.iter().map(|f| f.owner_id).collect();
        let mut paths = self.folder_repo.full_paths(&ids).await?;
        let owners = self.user_repo.minimal_by_id(&owner_ids).await?;

        folders
            .into_iter()
            .map(|f| {
                Ok(FolderResponse {
                    id: f.id,
                    full_path: paths.remove(&f.id).unwrap_or_else(|| f.name.clone()),
                    name: f.name,
                    description: f.description,
                    parent: f.parent_id,
                    owner: user_from(&owners, f.owner_id)?,
                    created_at: f.created_at,
                    modified_at: f.modified_at,
                    is_public: f.is_public,
                })
            })
            .collect()
    }

    async fn present_one(&self, folder: Folder) -> AppResult<FolderResponse> {
        let mut presented = self.present(vec![folder]).await?;
        presented
            .pop()
            .ok_or_else(|| AppError::NotFound("No Folder matches the given query.".into()))
    }

    async fn present_detail(&self, folder: Folder, shared_with: &[Uuid]) -> AppResult<FolderDetailResponse> {
        let mut shared_users: Vec<UserMinimal> = self.user_repo.find_minimal(shared_with).await?;
        shared_users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(FolderDetailResponse {
            folder: self.present_one(folder).await?,
            shared_users,
        })
    }

    pub async fn list(&self, requester: Requester, filter: &FolderFilter) -> AppResult<Vec<FolderResponse>> {
        let folders = self.folder_repo.list_visible(requester.id, filter).await?;
        self.present(folders).await
    }

    pub async fn get(&self, requester: Requester, id: Uuid) -> AppResult<FolderDetailResponse> {
        let guarded = self.guard.folder(requester, id, &Method::GET).await?;
        self.present_detail(guarded.object, &guarded.shared_with).await
    }

    pub async fn create(&self, requester: Requester, request: &FolderRequest) -> AppResult<FolderResponse> {
        let name = validated_name(
            request
                .name
                .as_deref()
                .ok_or_else(|| AppError::Validation("name: This field is required.".into()))?,
        )?;
        let parent_id = request.parent_id.flatten();
        if let Some(parent_id) = parent_id {
            self.guard.target_folder(requester, parent_id, "parent_id").await?;
        }

        let fields = FolderFields {
            name,
            description: request.description.clone().unwrap_or_default(),
            parent_id,
            is_public: request.is_public.unwrap_or(false),
        };
        let folder = self
            .folder_repo
            .create(requester.id, &fields)
            .await
            .map_err(duplicate_to_conflict)?;

        info!("Created folder {} ({}) for user {}", folder.name, folder.id, requester.id);
        self.present_one(folder).await
    }

    /// PUT (`partial = false`) or PATCH
    pub async fn update(
        &self,
        requester: Requester,
        id: Uuid,
        request: &FolderRequest,
        partial: bool,
    ) -> AppResult<FolderDetailResponse> {
        let method = if partial { Method::PATCH } else { Method::PUT };
        let current = self.guard.folder(requester, id, &method).await?.object;

        let name = match request.name.as_deref() {
            Some(raw) => validated_name(raw)?,
            None if partial => current.name.clone(),
            None => return Err(AppError::Validation("name: This field is required.".into())),
        };

        let moved_to = match request.parent_id {
            Some(Some(parent_id)) if Some(parent_id) != current.parent_id => {
                self.guard.target_folder(requester, parent_id, "parent_id").await?;
                Some(parent_id)
            }
            _ => None,
        };
        let parent_id = match (moved_to, request.parent_id) {
            (Some(parent_id), _) => Some(parent_id),
            (None, Some(parent_id)) => parent_id,
            (None, None) => current.parent_id,
        };

        let shared_ids = match request.shared_users_ids.as_deref() {
            Some(ids) => Some(self.validate_users("shared_users_ids", ids).await?),
            None => None,
        };

        let fields = FolderFields {
            name,
            description: request
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            parent_id,
            is_public: request.is_public.unwrap_or(current.is_public),
        };

        let mut tx = self.pool.begin().await?;
        if let Some(parent_id) = parent_id {
            // Every write of a parent link is serialized across the whole tree
            FolderRepository::lock_tree_with(&mut *tx).await?;
            if FolderRepository::is_in_subtree_with(&mut *tx, id, parent_id).await? {
                return Err(AppError::Validation(
                    "parent_id: A folder cannot be moved into itself or one of its subfolders.".into(),
                ));
            }
        }
        let folder = FolderRepository::update_with(&mut *tx, id, &fields)
            .await
            .map_err(duplicate_to_conflict)?;
        if let Some(shared_ids) = &shared_ids {
            ShareRepository::set_with(&mut *tx, ShareTarget::Folder, id, shared_ids).await?;
        }
        tx.commit().await?;

        let shared_with = match shared_ids {
            Some(ids) => ids,
            None => self.share_repo.shared_user_ids(ShareTarget::Folder, id).await?,
        };
        self.present_detail(folder, &shared_with).await
    }

    /// Owner or staff/admin; removes subfolders, their documents and stored files
    pub async fn delete(&self, requester: Requester, id: Uuid) -> AppResult<()> {
        let folder = self.guard.folder(requester, id, &Method::DELETE).await?.object;

        let mut tx = self.pool.begin().await?;
        let folder_ids = FolderRepository::lock_subtree_with(&mut *tx, id).await?;
        DocumentRepository::lock_in_folders_with(&mut *tx, &folder_ids).await?;
        let paths = DocumentRepository::file_paths_in_folders_with(&mut *tx, &folder_ids).await?;
        FolderRepository::delete_with(&mut *tx, id).await?;
        tx.commit().await?;

        info!("Deleted folder {} ({}) and {} stored files", folder.name, id, paths.len());

        self.storage.delete_best_effort(paths.iter().map(String::as_str)).await;
        Ok(())
    }

    /// Direct subfolders and documents
    pub async fn contents(&self, requester: Requester, id: Uuid) -> AppResult<FolderContentsResponse> {
        let folder = self.guard.folder(requester, id, &Method::GET).await?.object;
        let subfolders = self.folder_repo.children(folder.id).await?;

        Ok(FolderContentsResponse {
            subfolders: self.present(subfolders).await?,
            documents: self.documents.in_folder(folder.id).await?,
        })
    }

    async fn validate_users(&self, field: &str, user_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let mut unique = user_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let found = self.user_repo.existing_ids(&unique).await?;
        if let Some(missing) = unique.iter().find(|id| !found.contains(id)) {
            return Err(AppError::Validation(format!(
                "{}: Invalid pk \"{}\" - object does not exist.",
                field, missing
            )));
        }
        Ok(unique)
    }

    /// Add (`share = true`) or remove users from the share set
    pub async fn set_sharing(
        &self,
        requester: Requester,
        id: Uuid,
        user_ids: &[Uuid],
        share: bool,
    ) -> AppResult<FolderResponse> {
        let folder = self.guard.folder(requester, id, &Method::POST).await?.object;
        let unique = self.validate_users("user_ids", user_ids).await?;

        let mut conn = self.pool.acquire().await?;
        if share {
            let added = ShareRepository::add_with(&mut conn, ShareTarget::Folder, id, &unique).await?;
            info!("Shared folder {} with {} users", id, added);
        } else {
            let removed = ShareRepository::remove_with(&mut conn, ShareTarget::Folder, id, &unique).await?;
            info!("Unshared folder {} from {} users", id, removed);
        }

        self.present_one(folder).await
    }
}
