//! Article model
//!
//! This module provides:
//! - `Article` entity and `ArticleStatus` publication states
//! - Input types for creating and updating articles
//! - Feed pagination types (`FeedParams`, `FeedPage`, `TagFeedPage`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;

/// Words per minute assumed when estimating reading time
const READING_WPM: usize = 200;

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Article title
    pub title: String,
    /// Markdown body
    pub body: String,
    /// Author user ID (immutable after creation)
    pub author_id: i64,
    /// Publication status
    pub status: ArticleStatus,
    /// Denormalized like count
    #[serde(default)]
    pub likes: i64,
    /// Denormalized view count
    #[serde(default)]
    pub views: i64,
    /// Set once on the first draft-to-published transition
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Estimated reading time in minutes, based on a 200 wpm pace.
    pub fn reading_time_minutes(&self) -> u32 {
        let words = self
            .body
            .split_whitespace()
            .filter(|w| !w.chars().all(|c| "#_*`>-".contains(c)))
            .count();
        (words.div_ceil(READING_WPM)).max(1) as u32
    }
}

/// Article publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// Draft - visible only to the author
    #[default]
    Draft,
    /// Published - visible in public feeds
    Published,
}

impl ArticleStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }

    /// Parse status from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(ArticleStatus::Draft),
            "published" => Some(ArticleStatus::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    /// Article title
    pub title: String,
    /// Markdown body
    pub body: String,
    /// Tag names to attach (created lazily)
    #[serde(default)]
    pub tags: Vec<String>,
    /// Publication status (defaults to Draft)
    #[serde(default)]
    pub status: ArticleStatus,
}

impl CreateArticleInput {
    /// Create a new draft input with no tags
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
            status: ArticleStatus::Draft,
        }
    }

    /// Set the tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.status = status;
        self
    }
}

/// Input for updating an existing article; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArticleInput {
    /// New title (a changed title re-allocates the slug)
    pub title: Option<String>,
    /// New markdown body
    pub body: Option<String>,
    /// Replacement tag set
    pub tags: Option<Vec<String>>,
    /// New status
    pub status: Option<ArticleStatus>,
}

impl UpdateArticleInput {
    /// Create a new empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some() || self.body.is_some() || self.tags.is_some() || self.status.is_some()
    }
}

/// Full detail view of an article, as served on an article page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    /// The article itself
    pub article: Article,
    /// Attached tags
    pub tags: Vec<Tag>,
    /// Whether the requesting user has liked this article
    pub liked_by_viewer: bool,
}

/// Feed pagination parameters (1-indexed pages)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 8,
        }
    }
}

impl FeedParams {
    /// Create feed parameters; page is floored at 1, per_page clamped to 1..=50.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 50),
        }
    }

    /// Row offset for the underlying query
    pub fn offset(&self) -> i64 {
        ((self.page - 1) as i64) * (self.per_page as i64)
    }

    /// Row limit for the underlying query: one extra row is requested so
    /// the caller can detect whether a further page exists without a
    /// COUNT query.
    pub fn fetch_limit(&self) -> i64 {
        self.per_page as i64 + 1
    }
}

/// One page of a feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage<T> {
    /// Items in this page (at most `per_page`)
    pub items: Vec<T>,
    /// Whether at least one more item exists beyond this page
    pub has_more: bool,
}

impl<T> FeedPage<T> {
    /// Build a page from an over-fetched row set (`per_page + 1` rows
    /// requested). The sentinel row is dropped and only signals `has_more`.
    pub fn from_overfetch(mut rows: Vec<T>, params: &FeedParams) -> Self {
        let has_more = rows.len() > params.per_page as usize;
        if has_more {
            rows.truncate(params.per_page as usize);
        }
        Self {
            items: rows,
            has_more,
        }
    }

    /// Number of items in this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the page is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A tag-scoped feed page, which additionally carries the total number of
/// published articles under the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagFeedPage {
    /// Items in this page
    pub items: Vec<Article>,
    /// Whether at least one more item exists beyond this page
    pub has_more: bool,
    /// Total published articles carrying the tag
    pub count: i64,
}
