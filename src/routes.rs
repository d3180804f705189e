//! Router assembly.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::SharedState;

/// Build the application router with all routes.
pub fn build_router(state: SharedState) -> Router {
    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(handlers::health_check));

    // Accounts and tokens
    let auth_routes = Router::new()
        .route(
            "/api/auth/users",
            get(handlers::auth::list_users).post(handlers::auth::register),
        )
        .route("/api/auth/users/me", get(handlers::auth::me))
        .route("/api/auth/jwt/create", post(handlers::auth::create_token))
        .route("/api/auth/jwt/refresh", post(handlers::auth::refresh_token))
        .route("/api/auth/jwt/verify", post(handlers::auth::verify_token));

    let tag_routes = Router::new()
        .route(
            "/api/documents/tags",
            get(handlers::tags::list).post(handlers::tags::create),
        )
        .route(
            "/api/documents/tags/{id}",
            get(handlers::tags::get)
                .put(handlers::tags::update)
                .patch(handlers::tags::partial_update)
                .delete(handlers::tags::delete),
        );

    let folder_routes = Router::new()
        .route(
            "/api/documents/folders",
            get(handlers::folders::list).post(handlers::folders::create),
        )
        .route(
            "/api/documents/folders/{id}",
            get(handlers::folders::get)
                .put(handlers::folders::update)
                .patch(handlers::folders::partial_update)
                .delete(handlers::folders::delete),
        )
        .route(
            "/api/documents/folders/{id}/contents",
            get(handlers::folders::contents),
        )
        .route("/api/documents/folders/{id}/share", post(handlers::folders::share))
        .route(
            "/api/documents/folders/{id}/unshare",
            post(handlers::folders::unshare),
        );

    let document_routes = Router::new()
        .route(
            "/api/documents",
            get(handlers::documents::list).post(handlers::documents::create),
        )
        .route(
            "/api/documents/{id}",
            get(handlers::documents::get)
                .put(handlers::documents::update)
                .patch(handlers::documents::partial_update)
                .delete(handlers::documents::delete),
        )
        .route(
            "/api/documents/{id}/download",
            get(handlers::documents::download),
        )
        .route(
            "/api/documents/{id}/versions",
            get(handlers::documents::versions),
        )
        .route("/api/documents/{id}/share", post(handlers::documents::share))
        .route("/api/documents/{id}/unshare", post(handlers::documents::unshare))
        .route(
            "/api/documents/{id}/comments",
            get(handlers::documents::comments).post(handlers::documents::add_comment),
        );

    let version_routes = Router::new()
        .route("/api/documents/versions", get(handlers::versions::list))
        .route("/api/documents/versions/{id}", get(handlers::versions::get))
        .route(
            "/api/documents/versions/{id}/download",
            get(handlers::versions::download),
        );

    let comment_routes = Router::new()
        .route(
            "/api/documents/comments",
            get(handlers::comments::list).post(handlers::comments::create),
        )
        .route(
            "/api/documents/comments/{id}",
            get(handlers::comments::get)
                .put(handlers::comments::update)
                .patch(handlers::comments::partial_update)
                .delete(handlers::comments::delete),
        );

    let activity_routes = Router::new()
        .route("/api/documents/activities", get(handlers::activities::list))
        .route(
            "/api/documents/activities/{id}",
            get(handlers::activities::get),
        );

    let mut router = Router::new()
        .merge(health_routes)
        .merge(auth_routes)
        .merge(tag_routes)
        .merge(folder_routes)
        .merge(document_routes)
        .merge(version_routes)
        .merge(comment_routes)
        .merge(activity_routes)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(state.config.storage.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    // CORS is wide open only in development
    if state.config.is_development() {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
