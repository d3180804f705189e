//! Request bodies and response shapes of the REST API.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{Tag, UserMinimal};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenObtainRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenVerifyRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

// ---------------------------------------------------------------------------
// Tags, folders, sharing
// ---------------------------------------------------------------------------

/// Tag create/update body; `name` is optional only for PATCH
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagRequest {
    pub name: Option<String>,
}

/// Folder create/update body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<Uuid>>,
    pub is_public: Option<bool>,
    pub shared_users_ids: Option<Vec<Uuid>>,
}

/// Body of the share/unshare actions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub parent: Option<Uuid>,
    pub owner: UserMinimal,
    pub full_path: String,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderDetailResponse {
    #[serde(flatten)]
    pub folder: FolderResponse,
    pub shared_users: Vec<UserMinimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderContentsResponse {
    pub subfolders: Vec<FolderResponse>,
    pub documents: Vec<DocumentResponse>,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// An uploaded file as received from a multipart form
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Document create/update input, parsed from multipart or JSON
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub folder_id: Option<Option<Uuid>>,
    pub tag_ids: Option<Vec<Uuid>>,
    pub shared_users_ids: Option<Vec<Uuid>>,
    pub is_public: Option<bool>,
    #[serde(skip)]
    pub file: Option<Upload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub file: String,
    pub file_type: String,
    pub file_size: i64,
    pub checksum: String,
    pub folder: Option<Uuid>,
    pub tags: Vec<Tag>,
    pub owner: UserMinimal,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub is_public: bool,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDetailResponse {
    #[serde(flatten)]
    pub document: DocumentResponse,
    pub versions: Vec<VersionResponse>,
    pub comments: Vec<CommentResponse>,
    pub activities: Vec<ActivityResponse>,
    pub shared_users: Vec<UserMinimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub id: Uuid,
    pub document: Uuid,
    pub file: String,
    pub file_size: i64,
    pub checksum: String,
    pub version: i32,
    pub created_by: UserMinimal,
    pub created_at: NaiveDateTime,
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Comments and activity
// ---------------------------------------------------------------------------

/// Body of `POST /api/documents/comments`
#[derive(Debug, Clone, Deserialize)]
pub struct CommentCreateRequest {
    pub document: Uuid,
    pub content: String,
    pub parent_id: Option<Uuid>,
}

/// Body of `POST /api/documents/{id}/comments`
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentCommentRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentUpdateRequest {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub document: Uuid,
    pub user: UserMinimal,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub parent: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub document: Option<Uuid>,
    pub user: UserMinimal,
    pub activity_type: String,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub ip_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_request_null_parent_is_explicit() {
        let absent: FolderRequest = serde_json::from_str(r#"{"name": "a"}"#).unwrap();
        assert_eq!(absent.parent_id, None);

        let cleared: FolderRequest = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(cleared.parent_id, Some(None));

        let id = Uuid::new_v4();
        let set: FolderRequest = serde_json::from_str(&format!(r#"{{"parent_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.parent_id, Some(Some(id)));
    }

    #[test]
    fn test_share_request_defaults_to_empty() {
        let request: ShareRequest = serde_json::from_str("{}").unwrap();
        assert!(request.user_ids.is_empty());
    }

    #[test]
    fn test_detail_response_is_flat() {
        let owner = UserMinimal {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let now = chrono::Utc::now().naive_utc();
        let detail = FolderDetailResponse {
            folder: FolderResponse {
                id: Uuid::new_v4(),
                name: "Reports".into(),
                description: String::new(),
                parent: None,
                owner: owner.clone(),
                full_path: "Reports".into(),
                created_at: now,
                modified_at: now,
                is_public: false,
            },
            shared_users: vec![owner],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "Reports");
        assert_eq!(json["full_path"], "Reports");
        assert_eq!(json["shared_users"][0]["username"], "alice");
    }
}
