pub mod access;
pub mod activity_service;
pub mod comment_service;
pub mod document_service;
pub mod folder_service;
pub mod storage;
pub mod tag_service;
pub mod user_service;
pub mod version_service;

pub use access::AccessGuard;
pub use activity_service::{ActivityService, Actor};
pub use comment_service::CommentService;
pub use document_service::DocumentService;
pub use folder_service::FolderService;
pub use storage::MediaStorage;
pub use tag_service::TagService;
pub use user_service::UserService;
pub use version_service::VersionService;

use crate::error::{AppError, AppResult};
use crate::models::UserMinimal;
use std::collections::HashMap;
use uuid::Uuid;

/// File contents ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub checksum: String,
    pub bytes: Vec<u8>,
}

/// Look up a user that a row references by foreign key
pub(crate) fn user_from(users: &HashMap<Uuid, UserMinimal>, id: Uuid) -> AppResult<UserMinimal> {
    users
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::Message(format!("Referenced user {} is missing", id)))
}
