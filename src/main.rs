//! DocVault Backend Service
//!
//! Main entry point for the DocVault document management backend.
//! This service provides:
//! - REST API for folders, documents, versions, comments and tags
//! - JWT authentication
//! - Local media storage for uploaded files

use docvault_backend::config::AppConfig;
use docvault_backend::database::{create_pool, run_migrations};
use docvault_backend::error::{AppError, AppResult};
use docvault_backend::{build_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "docvault_backend={},sqlx=warn,tower_http=info",
            config.log_level
        )
        .into()
    });

    if config.log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, shutting down gracefully...");
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           DocVault Backend Service Starting              ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);
    info!("Media root: {}", config.storage.media_root.display());

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    // Run migrations
    info!("Running database migrations...");
    run_migrations(&pool, Some(&config.migrations_path))
        .await
        .map_err(|e| {
            error!("Database migration failed: {}", e);
            AppError::Database(e)
        })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    let http_port = config.http_port;
    let environment = config.environment.clone();
    let admin = config.admin.clone();

    let app_state = Arc::new(AppState::new(pool, config));
    info!("✓ Application state initialized with repositories");

    app_state.storage.ensure_root().await.map_err(|e| {
        error!("Media root is not usable: {}", e);
        e
    })?;
    info!("✓ Media storage ready at {}", app_state.storage.root().display());

    match admin {
        Some(admin) => {
            app_state.users.ensure_admin(&admin).await.map_err(|e| {
                error!("Failed to ensure administrator account: {}", e);
                e
            })?;
            info!("✓ Administrator account ensured");
        }
        None => warn!("ADMIN_USERNAME not configured - no administrator account ensured"),
    }

    let router = build_router(app_state.clone());
    info!("✓ HTTP router initialized");

    // =========================================================================
    // START SERVER
    // =========================================================================
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind HTTP server: {}", e)))?;

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           DocVault Backend Service Ready!                ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  REST API:     0.0.0.0:{}                              ║", http_port);
    info!("║  Environment:  {}                                    ║", environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| {
        error!("HTTP server error: {}", e);
        AppError::Message(format!("HTTP server error: {}", e))
    })?;

    app_state.database.pool().close().await;
    info!("DocVault backend service shutdown complete");
    Ok(())
}
