use super::access::{AccessGuard, Guarded};
use super::activity_service::{ActivityService, Actor};
use super::comment_service::CommentService;
use super::storage::{self, MediaStorage, StoredFile};
use super::version_service::VersionService;
use super::{user_from, Download};
use crate::dto::{
    CommentResponse, DocumentDetailResponse, DocumentInput, DocumentResponse, Upload, VersionResponse,
};
use crate::error::{AppError, AppResult};
use crate::models::{Document, UserMinimal};
use crate::permissions::Requester;
use crate::repositories::{
    DocumentFields, DocumentFilter, DocumentRepository, NewVersion, ShareRepository, ShareTarget,
    TagRepository, UserRepository, VersionRepository,
};
use axum::http::Method;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const TITLE_MAX_LEN: usize = 255;

fn validated_title(raw: &str) -> AppResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title: This field may not be blank.".into()));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(AppError::Validation(format!(
            "title: Ensure this field has no more than {} characters.",
            TITLE_MAX_LEN
        )));
    }
    Ok(title.to_string())
}

/// Report the first id of `requested` missing from `found`
fn check_all_exist(field: &str, requested: &[Uuid], found: &[Uuid]) -> AppResult<()> {
    match requested.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(AppError::Validation(format!(
            "{}: Invalid pk \"{}\" - object does not exist.",
            field, missing
        ))),
        None => Ok(()),
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

/// Document storage, versioning and sharing
pub struct DocumentService {
    pool: PgPool,
    document_repo: Arc<DocumentRepository>,
    tag_repo: Arc<TagRepository>,
    user_repo: Arc<UserRepository>,
    guard: Arc<AccessGuard>,
    versions: Arc<VersionService>,
    comments: Arc<CommentService>,
    activities: Arc<ActivityService>,
    storage: Arc<MediaStorage>,
}

impl DocumentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        document_repo: Arc<DocumentRepository>,
        tag_repo: Arc<TagRepository>,
        user_repo: Arc<UserRepository>,
        guard: Arc<AccessGuard>,
        versions: Arc<VersionService>,
        comments: Arc<CommentService>,
        activities: Arc<ActivityService>,
        storage: Arc<MediaStorage>,
    ) -> Self {
        Self {
            pool,
            document_repo,
            tag_repo,
            user_repo,
            guard,
            versions,
            comments,
            activities,
            storage,
        }
    }

    /// List shape for a batch of documents
    pub async fn present(&self, documents: Vec<Document>) -> AppResult<Vec<DocumentResponse>> {
        let ids: Vec<Uuid> = documents.iter().map(|d| d.id).collect();
        let owner_ids: Vec<Uuid> = documents.iter().map(|d| d.owner_id).collect();
        let mut tags = self.tag_repo.for_documents(&ids).await?;
        let owners = self.user_repo.minimal_by_id(&owner_ids).await?;

        documents
            .into_iter()
            .map(|d| {
                Ok(DocumentResponse {
                    id: d.id,
                    file: self.storage.url(&d.file_path),
                    title: d.title,
                    description: d.description,
                    file_type: d.file_type,
                    file_size: d.file_size,
                    checksum: d.checksum,
                    folder: d.folder_id,
                    tags: tags.remove(&d.id).unwrap_or_default(),
                    owner: user_from(&owners, d.owner_id)?,
                    created_at: d.created_at,
                    modified_at: d.modified_at,
                    is_public: d.is_public,
                    version: d.version,
                })
            })
            .collect()
    }

    async fn present_one(&self, document: Document) -> AppResult<DocumentResponse> {
        let mut presented = self.present(vec![document]).await?;
        presented
            .pop()
            .ok_or_else(|| AppError::NotFound("No Document matches the given query.".into()))
    }

    async fn shared_users(&self, user_ids: &[Uuid]) -> AppResult<Vec<UserMinimal>> {
        let mut users = self.user_repo.find_minimal(user_ids).await?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn present_detail(&self, guarded: Guarded<Document>) -> AppResult<DocumentDetailResponse> {
        let id = guarded.object.id;
        let versions = self.versions.for_document(id).await?;
        let comments = self.comments.for_document(id).await?;
        let activities = self.activities.for_document(id).await?;
        let shared_users = self.shared_users(&guarded.shared_with).await?;

        Ok(DocumentDetailResponse {
            document: self.present_one(guarded.object).await?,
            versions,
            comments,
            activities,
            shared_users,
        })
    }

    pub async fn list(&self, requester: Requester, filter: &DocumentFilter) -> AppResult<Vec<DocumentResponse>> {
        let documents = self.document_repo.list_visible(requester.id, filter).await?;
        self.present(documents).await
    }

    /// Direct contents of a folder the caller has already been checked against
    pub async fn in_folder(&self, folder_id: Uuid) -> AppResult<Vec<DocumentResponse>> {
        let documents = self.document_repo.in_folder(folder_id).await?;
        self.present(documents).await
    }

    pub async fn get(&self, requester: Requester, id: Uuid) -> AppResult<DocumentDetailResponse> {
        let guarded = self.guard.document(requester, id, &Method::GET).await?;
        self.present_detail(guarded).await
    }

    async fn validate_tags(&self, tag_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let tag_ids = dedup(tag_ids);
        let found = self.tag_repo.existing_ids(&tag_ids).await?;
        check_all_exist("tag_ids", &tag_ids, &found)?;
        Ok(tag_ids)
    }

    async fn validate_users(&self, field: &str, user_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let user_ids = dedup(user_ids);
        let found = self.user_repo.existing_ids(&user_ids).await?;
        check_all_exist(field, &user_ids, &found)?;
        Ok(user_ids)
    }

    async fn store_upload(&self, folder_id: Option<Uuid>, upload: &Upload) -> AppResult<(StoredFile, String)> {
        if upload.bytes.is_empty() {
            return Err(AppError::Validation("file: The submitted file is empty.".into()));
        }
        let path = storage::upload_path(folder_id, &upload.file_name);
        let stored = self.storage.save(&path, &upload.bytes).await?;
        let file_type = storage::file_type_of(&upload.file_name);
        Ok((stored, file_type))
    }

    /// Upload a new document at version 1
    pub async fn create(&self, actor: &Actor, input: DocumentInput) -> AppResult<DocumentResponse> {
        let requester = actor.requester();
        let title = validated_title(
            input
                .title
                .as_deref()
                .ok_or_else(|| AppError::Validation("title: This field is required.".into()))?,
        )?;
        let upload = input
            .file
            .as_ref()
            .ok_or_else(|| AppError::Validation("file: No file was submitted.".into()))?;

        let folder_id = input.folder_id.flatten();
        if let Some(folder_id) = folder_id {
            self.guard.target_folder(requester, folder_id, "folder_id").await?;
        }
        let tag_ids = self.validate_tags(input.tag_ids.as_deref().unwrap_or_default()).await?;

        let fields = DocumentFields {
            title,
            description: input.description.unwrap_or_default(),
            folder_id,
            is_public: input.is_public.unwrap_or(false),
        };

        let (stored, file_type) = self.store_upload(folder_id, upload).await?;
        match self.insert_document(actor, &fields, &stored, &file_type, &tag_ids).await {
            Ok(document) => {
                info!(
                    "Created document {} ({}) for user {}",
                    document.title, document.id, actor.id
                );
                self.present_one(document).await
            }
            Err(e) => {
                self.storage.delete_best_effort([stored.path.as_str()]).await;
                Err(e)
            }
        }
    }

    async fn insert_document(
        &self,
        actor: &Actor,
        fields: &DocumentFields,
        stored: &StoredFile,
        file_type: &str,
        tag_ids: &[Uuid],
    ) -> AppResult<Document> {
        let mut tx = self.pool.begin().await?;

        let document = DocumentRepository::insert_with(&mut *tx, actor.id, fields, stored, file_type).await?;
        TagRepository::set_for_document(&mut *tx, document.id, tag_ids).await?;
        ActivityService::log_created_with(&mut *tx, actor, &document).await?;
        Self::record_version(&mut *tx, &document, document.owner_id, "Initial version").await?;

        tx.commit().await?;
        Ok(document)
    }

    async fn record_version(
        conn: &mut PgConnection,
        document: &Document,
        created_by: Uuid,
        comment: &str,
    ) -> AppResult<()> {
        VersionRepository::insert_with(
            conn,
            NewVersion {
                document_id: document.id,
                file_path: &document.file_path,
                file_size: document.file_size,
                checksum: &document.checksum,
                version: document.version,
                created_by,
                comment,
            },
        )
        .await?;
        Ok(())
    }

    /// PUT (`partial = false`) or PATCH; a new file starts a new version
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        input: DocumentInput,
        partial: bool,
    ) -> AppResult<DocumentDetailResponse> {
        let requester = actor.requester();
        let method = if partial { Method::PATCH } else { Method::PUT };
        let current = self.guard.document(requester, id, &method).await?.object;

        let title = match input.title.as_deref() {
            Some(raw) => validated_title(raw)?,
            None if partial => current.title.clone(),
            None => return Err(AppError::Validation("title: This field is required.".into())),
        };

        let folder_id = match input.folder_id {
            Some(Some(folder_id)) if Some(folder_id) != current.folder_id => {
                self.guard.target_folder(requester, folder_id, "folder_id").await?;
                Some(folder_id)
            }
            Some(folder_id) => folder_id,
            None => current.folder_id,
        };

        let tag_ids = match input.tag_ids.as_deref() {
            Some(ids) => Some(self.validate_tags(ids).await?),
            None => None,
        };
        let shared_ids = match input.shared_users_ids.as_deref() {
            Some(ids) => Some(self.validate_users("shared_users_ids", ids).await?),
            None => None,
        };

        let fields = DocumentFields {
            title,
            description: input.description.unwrap_or_else(|| current.description.clone()),
            folder_id,
            is_public: input.is_public.unwrap_or(current.is_public),
        };

        let stored = match input.file.as_ref() {
            Some(upload) => Some(self.store_upload(folder_id, upload).await?),
            None => None,
        };

        let result = self
            .apply_update(actor, id, &fields, stored.as_ref(), tag_ids.as_deref(), shared_ids.as_deref())
            .await;
        if result.is_err() {
            if let Some((file, _)) = &stored {
                self.storage.delete_best_effort([file.path.as_str()]).await;
            }
        }
        let document = result?;

        info!("Updated document {} (v{})", document.id, document.version);
        let guarded = self.guard.document(requester, id, &Method::GET).await?;
        self.present_detail(guarded).await
    }

    async fn apply_update(
        &self,
        actor: &Actor,
        id: Uuid,
        fields: &DocumentFields,
        stored: Option<&(StoredFile, String)>,
        tag_ids: Option<&[Uuid]>,
        shared_ids: Option<&[Uuid]>,
    ) -> AppResult<Document> {
        let mut tx = self.pool.begin().await?;

        DocumentRepository::lock_with(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("No Document matches the given query.".into()))?;
        let mut document = DocumentRepository::update_fields_with(&mut *tx, id, fields).await?;

        if let Some(tag_ids) = tag_ids {
            TagRepository::set_for_document(&mut *tx, id, tag_ids).await?;
        }
        if let Some(shared_ids) = shared_ids {
            ShareRepository::set_with(&mut *tx, ShareTarget::Document, id, shared_ids).await?;
        }

        if let Some((file, file_type)) = stored {
            document = DocumentRepository::replace_file_with(&mut *tx, id, file, file_type).await?;
            let comment = format!("Version {}", document.version);
            Self::record_version(&mut *tx, &document, actor.id, &comment).await?;
            ActivityService::log_updated_with(&mut *tx, actor, &document).await?;
        }

        tx.commit().await?;
        Ok(document)
    }

    /// Owner or staff/admin; files of every version are removed after commit
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let document = self.guard.document(actor.requester(), id, &Method::DELETE).await?.object;

        let mut tx = self.pool.begin().await?;
        DocumentRepository::lock_with(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("No Document matches the given query.".into()))?;
        let paths = DocumentRepository::file_paths_with(&mut *tx, id).await?;
        ActivityService::log_deleted_with(&mut *tx, actor, &document).await?;
        DocumentRepository::delete_with(&mut *tx, id).await?;
        tx.commit().await?;

        info!("Deleted document {} ({})", document.title, id);
        self.storage.delete_best_effort(paths.iter().map(String::as_str)).await;
        Ok(())
    }

    /// Current file of a document
    pub async fn download(&self, actor: &Actor, id: Uuid) -> AppResult<Download> {
        let document = self.guard.document(actor.requester(), id, &Method::GET).await?.object;
        let bytes = match self.storage.read(&document.file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Stored file of document {} unavailable: {}", id, e);
                return Err(e);
            }
        };

        self.activities.log_accessed(actor, document.id, None).await?;

        Ok(Download {
            file_name: document.file_name().to_string(),
            checksum: document.checksum,
            bytes,
        })
    }

    pub async fn versions(&self, requester: Requester, id: Uuid) -> AppResult<Vec<VersionResponse>> {
        let document = self.guard.document(requester, id, &Method::GET).await?.object;
        self.versions.for_document(document.id).await
    }

    /// Add (`share = true`) or remove users from the share set
    pub async fn set_sharing(
        &self,
        actor: &Actor,
        id: Uuid,
        user_ids: &[Uuid],
        share: bool,
    ) -> AppResult<DocumentResponse> {
        let document = self.guard.document(actor.requester(), id, &Method::POST).await?.object;
        let unique = self.validate_users("user_ids", user_ids).await?;

        let mut tx = self.pool.begin().await?;
        if share {
            ShareRepository::add_with(&mut *tx, ShareTarget::Document, id, &unique).await?;
        } else {
            ShareRepository::remove_with(&mut *tx, ShareTarget::Document, id, &unique).await?;
        }
        ActivityService::log_sharing_with(&mut *tx, actor, id, share, user_ids.len()).await?;
        tx.commit().await?;

        self.present_one(document).await
    }

    pub async fn comments(&self, requester: Requester, id: Uuid) -> AppResult<Vec<CommentResponse>> {
        let document = self.guard.document(requester, id, &Method::GET).await?.object;
        self.comments.for_document(document.id).await
    }

    /// Anyone who can read the document may comment on it
    pub async fn add_comment(
        &self,
        actor: &Actor,
        id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<CommentResponse> {
        let document = self.guard.document(actor.requester(), id, &Method::GET).await?.object;
        self.comments
            .add_to_document(actor, document.id, content, parent_id)
            .await
    }
}
