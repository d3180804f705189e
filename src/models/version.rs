use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::document::base_name;

/// Snapshot of a document file at a given version
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub file_path: String,
    pub file_size: i64,
    pub checksum: String,
    pub version: i32,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub comment: String,
}

impl DocumentVersion {
    /// Download name: `<stem>_v<version><ext>`
    pub fn download_name(&self) -> String {
        let name = base_name(&self.file_path);
        match name.rfind('.') {
            Some(dot) if dot > 0 => format!("{}_v{}{}", &name[..dot], self.version, &name[dot..]),
            _ => format!("{}_v{}", name, self.version),
        }
    }

    /// Human readable label, e.g. "Quarterly report - v3"
    pub fn label(&self, document_title: &str) -> String {
        format!("{} - v{}", document_title, self.version)
    }
}
