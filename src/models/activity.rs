use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of action recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Created,
    Updated,
    Deleted,
    Accessed,
    Shared,
    Unshared,
    Commented,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        ActivityType::Created,
        ActivityType::Updated,
        ActivityType::Deleted,
        ActivityType::Accessed,
        ActivityType::Shared,
        ActivityType::Unshared,
        ActivityType::Commented,
    ];

    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "created" => Ok(ActivityType::Created),
            "updated" => Ok(ActivityType::Updated),
            "deleted" => Ok(ActivityType::Deleted),
            "accessed" => Ok(ActivityType::Accessed),
            "shared" => Ok(ActivityType::Shared),
            "unshared" => Ok(ActivityType::Unshared),
            "commented" => Ok(ActivityType::Commented),
            _ => Err(format!("Invalid activity type: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Created => "created",
            ActivityType::Updated => "updated",
            ActivityType::Deleted => "deleted",
            ActivityType::Accessed => "accessed",
            ActivityType::Shared => "shared",
            ActivityType::Unshared => "unshared",
            ActivityType::Commented => "commented",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity log entry; `document_id` is cleared when the document is deleted
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentActivity {
    pub id: Uuid,
    pub document_id: Option<Uuid>,
    pub user_id: Uuid,
    pub activity_type: String, // Stored as TEXT
    pub description: String,
    pub created_at: NaiveDateTime,
    pub ip_address: Option<String>,
}
