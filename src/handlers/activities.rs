//! Activity log handlers (read-only).

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{IdPath, QueryParams};
use crate::auth::AuthUser;
use crate::dto::ActivityResponse;
use crate::error::{AppError, AppResult};
use crate::models::ActivityType;
use crate::permissions::Requester;
use crate::repositories::ActivityFilter;
use crate::SharedState;

/// Query parameters for listing activities.
#[derive(Debug, Deserialize, Default)]
pub struct ListActivitiesQuery {
    /// One of created, updated, deleted, accessed, shared, unshared, commented
    pub activity_type: Option<String>,

    /// Document id
    pub document: Option<Uuid>,

    /// `created_at` or `-created_at`
    pub ordering: Option<String>,
}

impl ListActivitiesQuery {
    fn into_filter(self) -> AppResult<ActivityFilter> {
        let activity_type = match self.activity_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(ActivityType::from_str(raw).map_err(|_| {
                AppError::Validation(format!(
                    "activity_type: Select a valid choice. {} is not one of the available choices.",
                    raw
                ))
            })?),
        };

        // Only created_at is orderable; the last recognised field wins
        let oldest_first = self
            .ordering
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter_map(|field| match field {
                "created_at" => Some(true),
                "-created_at" => Some(false),
                _ => None,
            })
            .next_back()
            .unwrap_or(false);

        Ok(ActivityFilter {
            activity_type,
            document_id: self.document,
            oldest_first,
        })
    }
}

/// Staff/admin see every entry; others see activity on documents they own.
///
/// `GET /api/documents/activities`
///
/// # Query Parameters
///
/// - `activity_type`: e.g. `shared`
/// - `document`: document id
/// - `ordering`: `created_at` or `-created_at` (default)
pub async fn list(
    State(state): State<SharedState>,
    user: AuthUser,
    QueryParams(query): QueryParams<ListActivitiesQuery>,
) -> AppResult<Json<Vec<ActivityResponse>>> {
    let filter = query.into_filter()?;
    Ok(Json(state.activities.list(Requester::from(&user), &filter).await?))
}

/// `GET /api/documents/activities/{id}`
pub async fn get(
    State(state): State<SharedState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<ActivityResponse>> {
    Ok(Json(state.activities.get(Requester::from(&user), id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(activity_type: Option<&str>, ordering: Option<&str>) -> ListActivitiesQuery {
        ListActivitiesQuery {
            activity_type: activity_type.map(str::to_string),
            document: None,
            ordering: ordering.map(str::to_string),
        }
    }

    #[test]
    fn test_activity_filter_from_query() {
        let filter = query(Some("shared"), None).into_filter().unwrap();
        assert_eq!(filter.activity_type, Some(ActivityType::Shared));
        assert!(!filter.oldest_first);

        let filter = query(None, Some("created_at")).into_filter().unwrap();
        assert_eq!(filter.activity_type, None);
        assert!(filter.oldest_first);

        let filter = query(Some(""), Some("title,-created_at")).into_filter().unwrap();
        assert!(!filter.oldest_first);
    }

    #[test]
    fn test_unknown_activity_type_rejected() {
        let err = query(Some("printed"), None).into_filter().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
