//! Domain models for the DocVault backend.
//!
//! Each model maps one database table; join tables (tags, shares) are
//! handled directly by the repositories.

pub mod activity;
pub mod comment;
pub mod document;
pub mod folder;
pub mod tag;
pub mod user;
pub mod version;

// Re-export all models for convenient access
pub use activity::{ActivityType, DocumentActivity};
pub use comment::Comment;
pub use document::Document;
pub use folder::Folder;
pub use tag::Tag;
pub use user::{User, UserMinimal};
pub use version::DocumentVersion;
