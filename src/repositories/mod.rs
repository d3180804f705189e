pub mod activity_repository;
pub mod comment_repository;
pub mod document_repository;
pub mod filters;
pub mod folder_repository;
pub mod share_repository;
pub mod tag_repository;
pub mod user_repository;
pub mod version_repository;

// Re-export all repositories for convenient access
pub use activity_repository::{ActivityFilter, ActivityRepository, ActivityScope, NewActivity};
pub use comment_repository::CommentRepository;
pub use document_repository::{DocumentFields, DocumentFilter, DocumentRepository};
pub use folder_repository::{FolderFields, FolderFilter, FolderRepository};
pub use share_repository::{ShareRepository, ShareTarget};
pub use tag_repository::{TagFilter, TagRepository};
pub use user_repository::{NewUser, UserRepository};
pub use version_repository::{NewVersion, VersionRepository};
