use crate::dto::TagRequest;
use crate::error::{option_to_result, AppError, AppResult, RepositoryError};
use crate::models::tag::TAG_NAME_MAX_LEN;
use crate::models::Tag;
use crate::repositories::{TagFilter, TagRepository};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Trimmed tag name, checked for length and a usable slug
fn validated_name(raw: &str) -> AppResult<(String, String)> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name: This field may not be blank.".into()));
    }
    if name.chars().count() > TAG_NAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "name: Ensure this field has no more than {} characters.",
            TAG_NAME_MAX_LEN
        )));
    }
    let slug = Tag::slugify(name);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "name: Must contain at least one letter or digit.".into(),
        ));
    }
    Ok((name.to_string(), slug))
}

fn duplicate_to_conflict(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::Duplicate(_) => AppError::Conflict("tag with this name already exists.".into()),
        other => other.into(),
    }
}

/// Tag catalogue shared by all users
pub struct TagService {
    tag_repo: Arc<TagRepository>,
}

impl TagService {
    pub fn new(tag_repo: Arc<TagRepository>) -> Self {
        Self { tag_repo }
    }

    pub async fn list(&self, filter: &TagFilter) -> AppResult<Vec<Tag>> {
        Ok(self.tag_repo.list(filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Tag> {
        option_to_result(self.tag_repo.find_by_id(id).await?, "No Tag matches the given query.")
    }

    pub async fn create(&self, request: &TagRequest) -> AppResult<Tag> {
        let raw = request
            .name
            .as_deref()
            .ok_or_else(|| AppError::Validation("name: This field is required.".into()))?;
        let (name, slug) = validated_name(raw)?;

        let tag = self.tag_repo.create(&name, &slug).await.map_err(duplicate_to_conflict)?;
        info!("Created tag {} ({})", tag.name, tag.slug);
        Ok(tag)
    }

    /// PUT requires a name; PATCH without one leaves the tag unchanged
    pub async fn update(&self, id: Uuid, request: &TagRequest, partial: bool) -> AppResult<Tag> {
        let current = self.get(id).await?;
        let raw = match (request.name.as_deref(), partial) {
            (Some(name), _) => name,
            (None, true) => return Ok(current),
            (None, false) => return Err(AppError::Validation("name: This field is required.".into())),
        };
        let (name, slug) = validated_name(raw)?;

        Ok(self
            .tag_repo
            .update(id, &name, &slug)
            .await
            .map_err(duplicate_to_conflict)?)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.tag_repo.delete(id).await? {
            return Err(AppError::NotFound("No Tag matches the given query.".into()));
        }
        info!("Deleted tag {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_name() {
        let (name, slug) = validated_name("  Quarterly Reports ").unwrap();
        assert_eq!(name, "Quarterly Reports");
        assert_eq!(slug, "quarterly-reports");

        assert!(validated_name("   ").is_err());
        assert!(validated_name("!!!").is_err());
        assert!(validated_name(&"a".repeat(51)).is_err());
        assert!(validated_name(&"a".repeat(50)).is_ok());
    }
}
