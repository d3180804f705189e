use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored file together with its metadata and sharing settings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64, // bytes
    pub checksum: String, // SHA-256, hex
    pub folder_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub is_public: bool,
    pub version: i32,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

impl Document {
    /// Base name of the stored file, used as the download file name
    pub fn file_name(&self) -> &str {
        base_name(&self.file_path)
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Last component of a `/`-separated storage path
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
