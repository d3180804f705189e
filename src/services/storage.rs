//! Local filesystem storage for uploaded document files.
//!
//! Files live under the media root (the `media_volume` in production) at
//! relative paths such as `documents/<folder>/<uuid>.<ext>`. Those relative
//! paths are what the database stores.

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Result of persisting an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub size: i64,
    pub checksum: String,
}

/// Media storage rooted at `MEDIA_ROOT`
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    media_url: String,
}

/// Extension of an uploaded file name: the text after the last `.`
fn extension_of(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(dot) if dot + 1 < base.len() => Some(&base[dot + 1..]),
        _ => None,
    }
}

/// Lowercased extension of a stored path without the dot, or empty
pub fn file_type_of(path: &str) -> String {
    extension_of(path)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Relative storage path for a new upload
///
/// The stored name is a fresh UUID so uploads never collide; only the
/// extension of the client's file name survives.
pub fn upload_path(folder_id: Option<Uuid>, original_name: &str) -> String {
    let ext = file_type_of(original_name);
    let file_name = if ext.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}.{}", Uuid::new_v4(), ext)
    };

    match folder_id {
        Some(folder) => format!("documents/{}/{}", folder, file_name),
        None => format!("documents/{}", file_name),
    }
}

/// SHA-256 of the content, hex encoded
pub fn checksum_of(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, media_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            media_url: media_url.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.media_root.clone(), config.media_url.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the media root if needed
    pub async fn ensure_root(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create media root {:?}: {}", self.root, e)))
    }

    /// Absolute location of a stored path; rejects anything escaping the root
    pub fn resolve(&self, relative: &str) -> AppResult<PathBuf> {
        let rel = Path::new(relative);
        if relative.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(AppError::Validation(format!("Invalid storage path: {}", relative)));
        }
        Ok(self.root.join(rel))
    }

    /// Public URL of a stored file
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.media_url, relative)
    }

    /// Write content to `relative`, creating parent directories
    pub async fn save(&self, relative: &str, bytes: &[u8]) -> AppResult<StoredFile> {
        let target = self.resolve(relative)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create {:?}: {}", parent, e)))?;
        }

        // Write beside the target and rename so readers never see a partial file
        let partial = target.with_extension(format!("{}.part", Uuid::new_v4().simple()));
        tokio::fs::write(&partial, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {:?}: {}", partial, e)))?;
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(AppError::Storage(format!("Failed to store {:?}: {}", target, e)));
        }

        debug!("Stored {} ({} bytes)", relative, bytes.len());

        Ok(StoredFile {
            path: relative.to_string(),
            size: bytes.len() as i64,
            checksum: checksum_of(bytes),
        })
    }

    /// Read a stored file
    pub async fn read(&self, relative: &str) -> AppResult<Vec<u8>> {
        let target = self.resolve(relative)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("File not found in storage".to_string()))
            }
            Err(e) => Err(AppError::Storage(format!("Failed to read {:?}: {}", target, e))),
        }
    }

    /// Remove a stored file; a missing file is not an error
    pub async fn delete(&self, relative: &str) -> AppResult<()> {
        let target = self.resolve(relative)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete {:?}: {}", target, e))),
        }
    }

    /// Remove several files, logging failures instead of returning them
    pub async fn delete_best_effort<'a, I>(&self, paths: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for path in paths {
            if let Err(e) = self.delete(path).await {
                warn!("Could not remove stored file {}: {}", path, e);
            }
        }
    }
}
