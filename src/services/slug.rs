//! Slug allocation
//!
//! Derives a URL-safe, unique identifier from an article title. The base
//! slug is the normalized title; collisions are resolved by a sequential
//! `-1`, `-2`, ... probe against the article store, so the result is
//! deterministic for a given set of existing slugs.

use crate::db::repositories::ArticleRepository;
use anyhow::Result;
use std::sync::Arc;

/// Base used when a title normalizes to nothing (all-symbol titles)
const EMPTY_TITLE_BASE: &str = "untitled";

/// Normalize a title into a base slug: lowercase, `[a-z0-9]` kept,
/// every other character treated as a separator, separator runs
/// collapsed, ends trimmed.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_separator = true; // leading separators are dropped

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_separator = false;
        } else if !prev_separator {
            slug.push('-');
            prev_separator = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

/// Allocates unique slugs against the article store.
pub struct SlugAllocator {
    articles: Arc<dyn ArticleRepository>,
}

impl SlugAllocator {
    /// Create a new slug allocator
    pub fn new(articles: Arc<dyn ArticleRepository>) -> Self {
        Self { articles }
    }

    /// Allocate a unique slug for a new article.
    ///
    /// Probes `base`, `base-1`, `base-2`, ... and returns the first free
    /// candidate. Errors from the existence check propagate unchanged; a
    /// slug must never be guessed when the store cannot be consulted.
    pub async fn allocate(&self, title: &str) -> Result<String> {
        self.probe(title, None).await
    }

    /// Allocate a slug for an updated title, ignoring the article's own
    /// current slug. Only called when the title actually changed; an
    /// unchanged title keeps its slug so existing links stay valid.
    pub async fn allocate_for_update(&self, title: &str, article_id: i64) -> Result<String> {
        self.probe(title, Some(article_id)).await
    }

    async fn probe(&self, title: &str, exclude_id: Option<i64>) -> Result<String> {
        let base = slugify(title);
        let base = if base.is_empty() {
            EMPTY_TITLE_BASE.to_string()
        } else {
            base
        };

        let mut candidate = base.clone();
        let mut counter = 1u32;

        loop {
            let taken = match exclude_id {
                Some(id) => {
                    self.articles
                        .exists_by_slug_excluding(&candidate, id)
                        .await?
                }
                None => self.articles.exists_by_slug(&candidate).await?,
            };

            if !taken {
                return Ok(candidate);
            }

            candidate = format!("{}-{}", base, counter);
            counter += 1;
        }
    }
}
