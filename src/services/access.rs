//! Loading folders and documents on behalf of a caller.
//!
//! An object outside the caller's visible set is reported as missing (404);
//! a visible object the caller may not act on is forbidden (403).

use crate::error::{AppError, AppResult};
use crate::models::{Document, Folder};
use crate::permissions::{self, AccessFacts, Requester};
use crate::repositories::{DocumentRepository, FolderRepository, ShareRepository, ShareTarget};
use axum::http::Method;
use std::sync::Arc;
use uuid::Uuid;

/// A loaded object together with the users it is shared with
#[derive(Debug, Clone)]
pub struct Guarded<T> {
    pub object: T,
    pub shared_with: Vec<Uuid>,
}

/// Outcome of checking a caller against an object's access facts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Hidden,
    Denied,
}

pub fn judge(requester: Requester, facts: AccessFacts<'_>, method: &Method) -> Verdict {
    if !permissions::is_visible(requester, facts) {
        Verdict::Hidden
    } else if permissions::is_owner_admin_or_shared(requester, facts, method) {
        Verdict::Allowed
    } else {
        Verdict::Denied
    }
}

fn enforce(verdict: Verdict, missing: &str) -> AppResult<()> {
    match verdict {
        Verdict::Allowed => Ok(()),
        Verdict::Hidden => Err(AppError::NotFound(missing.to_string())),
        Verdict::Denied => permissions::require(false),
    }
}

/// Object-level access checks for folders and documents
pub struct AccessGuard {
    folder_repo: Arc<FolderRepository>,
    document_repo: Arc<DocumentRepository>,
    share_repo: Arc<ShareRepository>,
}

impl AccessGuard {
    pub fn new(
        folder_repo: Arc<FolderRepository>,
        document_repo: Arc<DocumentRepository>,
        share_repo: Arc<ShareRepository>,
    ) -> Self {
        Self {
            folder_repo,
            document_repo,
            share_repo,
        }
    }

    /// Load a document the caller may act on with `method`
    pub async fn document(&self, requester: Requester, id: Uuid, method: &Method) -> AppResult<Guarded<Document>> {
        const MISSING: &str = "No Document matches the given query.";

        let document = self
            .document_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(MISSING.to_string()))?;
        let shared_with = self.share_repo.shared_user_ids(ShareTarget::Document, id).await?;

        let facts = AccessFacts {
            owner_id: document.owner_id,
            is_public: document.is_public,
            shared_with: &shared_with,
        };
        enforce(judge(requester, facts, method), MISSING)?;

        Ok(Guarded {
            object: document,
            shared_with,
        })
    }

    /// Load a folder the caller may act on with `method`
    pub async fn folder(&self, requester: Requester, id: Uuid, method: &Method) -> AppResult<Guarded<Folder>> {
        const MISSING: &str = "No Folder matches the given query.";

        let folder = self
            .folder_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(MISSING.to_string()))?;
        let shared_with = self.share_repo.shared_user_ids(ShareTarget::Folder, id).await?;

        let facts = AccessFacts {
            owner_id: folder.owner_id,
            is_public: folder.is_public,
            shared_with: &shared_with,
        };
        enforce(judge(requester, facts, method), MISSING)?;

        Ok(Guarded {
            object: folder,
            shared_with,
        })
    }

    /// Resolve a folder reference in a request body (`parent_id`, `folder_id`).
    /// Unknown or invisible folders are a validation error; the caller must be
    /// able to write into the folder.
    pub async fn target_folder(&self, requester: Requester, id: Uuid, field: &str) -> AppResult<Folder> {
        match self.folder(requester, id, &Method::POST).await {
            Ok(guarded) => Ok(guarded.object),
            Err(AppError::NotFound(_)) => Err(AppError::Validation(format!(
                "{}: Invalid pk \"{}\" - object does not exist.",
                field, id
            ))),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_hides_private_objects() {
        let owner = Requester { id: Uuid::new_v4(), privileged: false };
        let stranger = Requester { id: Uuid::new_v4(), privileged: false };
        let facts = AccessFacts {
            owner_id: owner.id,
            is_public: false,
            shared_with: &[],
        };

        assert_eq!(judge(owner, facts, &Method::DELETE), Verdict::Allowed);
        assert_eq!(judge(stranger, facts, &Method::GET), Verdict::Hidden);
        assert_eq!(judge(stranger, facts, &Method::DELETE), Verdict::Hidden);
    }

    #[test]
    fn test_judge_denies_writes_to_public_objects() {
        let owner = Requester { id: Uuid::new_v4(), privileged: false };
        let stranger = Requester { id: Uuid::new_v4(), privileged: false };
        let facts = AccessFacts {
            owner_id: owner.id,
            is_public: true,
            shared_with: &[],
        };

        assert_eq!(judge(stranger, facts, &Method::GET), Verdict::Allowed);
        assert_eq!(judge(stranger, facts, &Method::PATCH), Verdict::Denied);
    }

    #[test]
    fn test_privileged_users_still_need_visibility() {
        let owner = Requester { id: Uuid::new_v4(), privileged: false };
        let admin = Requester { id: Uuid::new_v4(), privileged: true };
        let shared = [admin.id];
        let private = AccessFacts {
            owner_id: owner.id,
            is_public: false,
            shared_with: &[],
        };
        let shared_with_admin = AccessFacts {
            owner_id: owner.id,
            is_public: false,
            shared_with: &shared,
        };

        assert_eq!(judge(admin, private, &Method::GET), Verdict::Hidden);
        assert_eq!(judge(admin, shared_with_admin, &Method::DELETE), Verdict::Allowed);
    }

    #[test]
    fn test_enforce_maps_verdicts() {
        assert!(enforce(Verdict::Allowed, "x").is_ok());
        assert!(enforce(Verdict::Hidden, "x").unwrap_err().is_not_found());
        assert!(matches!(enforce(Verdict::Denied, "x"), Err(AppError::Forbidden(_))));
    }
}
