//! Tag service
//!
//! Lazy find-or-create tags, popular-tag listings, and tag search.
//! Tag names are normalized to lowercase; only ASCII alphanumerics of at
//! most 30 characters are accepted.

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagWithCount};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static TAG_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{1,30}$").expect("tag name regex is valid"));

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Malformed tag name
    #[error("Invalid tag name: {0}")]
    Validation(String),

    /// Dependency failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Normalize a tag name to its canonical lowercase form, or `None` when
/// the name is not a valid tag (empty, too long, non-alphanumeric).
pub fn normalize_tag(name: &str) -> Option<String> {
    let normalized = name.trim().to_lowercase();
    if TAG_NAME_RE.is_match(&normalized) {
        Some(normalized)
    } else {
        None
    }
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Get an existing tag by name or create it lazily.
    pub async fn find_or_create(&self, name: &str) -> Result<Tag, TagServiceError> {
        let normalized = normalize_tag(name)
            .ok_or_else(|| TagServiceError::Validation(name.to_string()))?;

        let tag = self
            .repo
            .find_or_create(&normalized)
            .await
            .context("Failed to find or create tag")?;

        Ok(tag)
    }

    /// Tags ordered by published-article count descending.
    pub async fn popular(&self, limit: i64) -> Result<Vec<TagWithCount>, TagServiceError> {
        let tags = self
            .repo
            .popular(limit)
            .await
            .context("Failed to list popular tags")?;
        Ok(tags)
    }

    /// Case-insensitive contains-search over tag names. A blank query
    /// matches nothing.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<Tag>, TagServiceError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tags = self
            .repo
            .search(query.trim(), limit)
            .await
            .context("Failed to search tags")?;
        Ok(tags)
    }

    /// Tags attached to an article
    pub async fn for_article(&self, article_id: i64) -> Result<Vec<Tag>, TagServiceError> {
        let tags = self
            .repo
            .for_article(article_id)
            .await
            .context("Failed to get tags for article")?;
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("Rust"), Some("rust".to_string()));
        assert_eq!(normalize_tag("  WebDev  "), Some("webdev".to_string()));
        assert_eq!(normalize_tag("2024"), Some("2024".to_string()));

        assert_eq!(normalize_tag(""), None);
        assert_eq!(normalize_tag("   "), None);
        assert_eq!(normalize_tag("has space"), None);
        assert_eq!(normalize_tag("hyphen-ated"), None);
        assert_eq!(normalize_tag(&"x".repeat(31)), None);
    }

    async fn setup() -> TagService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        TagService::new(Arc::new(SqlxTagRepository::new(pool)))
    }

    #[tokio::test]
    async fn test_find_or_create_normalizes_case() {
        let service = setup().await;

        let first = service.find_or_create("Rust").await.unwrap();
        let second = service.find_or_create("RUST").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "rust");
    }

    #[tokio::test]
    async fn test_find_or_create_rejects_invalid() {
        let service = setup().await;

        let result = service.find_or_create("not a tag").await;
        assert!(matches!(result, Err(TagServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_blank_query_is_empty() {
        let service = setup().await;
        service.find_or_create("rust").await.unwrap();

        assert!(service.search("   ", 10).await.unwrap().is_empty());
        assert_eq!(service.search("rus", 10).await.unwrap().len(), 1);
    }
}
