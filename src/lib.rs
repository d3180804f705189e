//! DocVault Backend Library
//!
//! This module exposes the backend components for use by tests and other consumers.

pub mod auth;
pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod permissions;
pub mod repositories;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use routes::build_router;

use auth::TokenService;
use database::Database;
use repositories::*;
use services::*;
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub config: AppConfig,
    pub database: Database,
    pub tokens: Arc<TokenService>,
    pub user_repo: Arc<UserRepository>,
    pub storage: Arc<MediaStorage>,
    pub users: Arc<UserService>,
    pub tags: Arc<TagService>,
    pub folders: Arc<FolderService>,
    pub documents: Arc<DocumentService>,
    pub versions: Arc<VersionService>,
    pub comments: Arc<CommentService>,
    pub activities: Arc<ActivityService>,
}

/// State handed to every handler
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Create a new AppState with initialized repositories and services
    pub fn new(pool: sqlx::PgPool, config: AppConfig) -> Self {
        let database = Database::new(pool.clone());
        let tokens = Arc::new(TokenService::new(&config.auth));
        let storage = Arc::new(MediaStorage::from_config(&config.storage));

        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let tag_repo = Arc::new(TagRepository::new(pool.clone()));
        let folder_repo = Arc::new(FolderRepository::new(pool.clone()));
        let document_repo = Arc::new(DocumentRepository::new(pool.clone()));
        let share_repo = Arc::new(ShareRepository::new(pool.clone()));
        let version_repo = Arc::new(VersionRepository::new(pool.clone()));
        let comment_repo = Arc::new(CommentRepository::new(pool.clone()));
        let activity_repo = Arc::new(ActivityRepository::new(pool.clone()));

        let guard = Arc::new(AccessGuard::new(
            folder_repo.clone(),
            document_repo.clone(),
            share_repo.clone(),
        ));

        let activities = Arc::new(ActivityService::new(activity_repo, user_repo.clone()));
        let versions = Arc::new(VersionService::new(
            version_repo,
            user_repo.clone(),
            guard.clone(),
            activities.clone(),
            storage.clone(),
        ));
        let comments = Arc::new(CommentService::new(
            pool.clone(),
            comment_repo,
            user_repo.clone(),
            guard.clone(),
        ));
        let documents = Arc::new(DocumentService::new(
            pool.clone(),
            document_repo.clone(),
            tag_repo.clone(),
            user_repo.clone(),
            guard.clone(),
            versions.clone(),
            comments.clone(),
            activities.clone(),
            storage.clone(),
        ));
        let folders = Arc::new(FolderService::new(
            pool,
            folder_repo,
            share_repo,
            user_repo.clone(),
            guard,
            documents.clone(),
            storage.clone(),
        ));

        Self {
            config,
            database,
            users: Arc::new(UserService::new(user_repo.clone(), tokens.clone())),
            tags: Arc::new(TagService::new(tag_repo)),
            tokens,
            user_repo,
            storage,
            folders,
            documents,
            versions,
            comments,
            activities,
        }
    }
}
