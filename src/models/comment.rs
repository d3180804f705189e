use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Comment on a document, optionally replying to another comment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub parent_id: Option<Uuid>,
}

impl Comment {
    pub fn label(&self, username: &str, document_title: &str) -> String {
        format!("Comment by {} on {}", username, document_title)
    }
}
