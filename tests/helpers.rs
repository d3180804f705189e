#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use docvault_backend::auth::hash_password;
use docvault_backend::config::{AppConfig, DatabaseConfig};
use docvault_backend::database::create_lazy_pool;
use docvault_backend::dto::{DocumentDetailResponse, DocumentInput, DocumentResponse, Upload};
use docvault_backend::models::User;
use docvault_backend::repositories::NewUser;
use docvault_backend::services::Actor;
use docvault_backend::{build_router, AppState, SharedState};
use serde_json::Value;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Application wired to a pool and a throwaway media root
pub struct TestApp {
    pub state: SharedState,
    pub router: Router,
    _media: TempDir,
}

impl TestApp {
    /// Full application on a migrated database (use with sqlx::test)
    pub fn from_pool(pool: PgPool) -> Self {
        let media = TempDir::new().expect("Failed to create media dir");
        let mut config = AppConfig::default();
        config.auth.secret_key = "test-secret".to_string();
        config.storage.media_root = media.path().to_path_buf();

        let state = Arc::new(AppState::new(pool, config));
        Self {
            router: build_router(state.clone()),
            state,
            _media: media,
        }
    }

    /// Application whose pool never reaches a server; only paths that
    /// fail before touching the database are usable
    pub fn without_database() -> Self {
        let config = DatabaseConfig {
            url: "postgresql://postgres@127.0.0.1:1/docvault_test".to_string(),
            acquire_timeout_secs: 1,
            ..DatabaseConfig::default()
        };
        let pool = create_lazy_pool(&config).expect("Failed to create lazy pool");
        Self::from_pool(pool)
    }

    pub async fn create_user(&self, username: &str) -> User {
        let password_hash = hash_password(TEST_PASSWORD).expect("Failed to hash password");
        self.state
            .user_repo
            .create(NewUser {
                username,
                email: &format!("{}@example.com", username),
                first_name: "",
                last_name: "",
                password_hash: &password_hash,
            })
            .await
            .expect("Failed to create user")
    }

    pub async fn create_admin(&self, username: &str) -> User {
        let user = self.create_user(username).await;
        self.state
            .user_repo
            .set_privileges(user.id, true, true)
            .await
            .expect("Failed to promote user")
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state
            .tokens
            .issue_access(user.id)
            .expect("Failed to issue token")
    }

    /// Upload a small text document through the service layer
    pub async fn upload(&self, owner: &User, title: &str, contents: &str) -> DocumentResponse {
        let input = DocumentInput {
            title: Some(title.to_string()),
            file: Some(Upload {
                file_name: format!("{}.txt", title.to_lowercase().replace(' ', "_")),
                bytes: contents.as_bytes().to_vec(),
            }),
            ..DocumentInput::default()
        };
        self.state
            .documents
            .create(&actor(owner), input)
            .await
            .expect("Failed to upload document")
    }

    /// Upload a new file for an existing document, creating the next version
    pub async fn replace_file(&self, owner: &User, document_id: Uuid, contents: &str) -> DocumentDetailResponse {
        let input = DocumentInput {
            file: Some(Upload {
                file_name: "replacement.txt".to_string(),
                bytes: contents.as_bytes().to_vec(),
            }),
            ..DocumentInput::default()
        };
        self.state
            .documents
            .update(&actor(owner), document_id, input, true)
            .await
            .expect("Failed to replace file")
    }

    /// Stored files of a document and all of its versions
    pub async fn stored_files(&self, document_id: Uuid) -> Vec<PathBuf> {
        let paths: Vec<String> = sqlx::query_scalar(
            "SELECT file_path FROM documents WHERE id = $1 \
             UNION SELECT file_path FROM document_versions WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_all(self.state.database.pool())
        .await
        .expect("Failed to load file paths");

        paths
            .iter()
            .map(|p| self.state.storage.resolve(p).expect("Invalid stored path"))
            .collect()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed")
    }
}

pub fn actor(user: &User) -> Actor {
    Actor {
        id: user.id,
        privileged: user.is_privileged(),
        ip_address: Some("127.0.0.1".to_string()),
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("Failed to build request")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
