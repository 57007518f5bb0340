//! Article service
//!
//! Business logic for articles:
//! - Create, update, delete, publish/unpublish with author-only checks
//! - Slug allocation (stable across updates unless the title changes)
//! - Tag association via lazy find-or-create
//! - The feed variants: published, search, tag-scoped, author-scoped
//!
//! Feeds over-fetch one row beyond the page size; the sentinel row only
//! signals that a further page exists and is never returned.

use crate::db::repositories::{
    ArticleRepository, LikeRepository, NewArticle, TagRepository, UserRepository,
};
use crate::models::{
    Article, ArticleDetail, ArticleStatus, CreateArticleInput, FeedPage, FeedParams, SessionUser,
    TagFeedPage, UpdateArticleInput,
};
use crate::services::slug::SlugAllocator;
use crate::services::tag::normalize_tag;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Maximum title length in characters
const TITLE_MAX: usize = 200;

/// Maximum number of tags per article
pub const MAX_ARTICLE_TAGS: usize = 3;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Article (or referenced user) not found
    #[error("Article not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to perform this operation
    #[error("Not authorized")]
    Unauthorized,

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Slug race lost against a concurrent insert
    #[error("Article slug already exists: {0}")]
    DuplicateSlug(String),

    /// Dependency failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Article service
pub struct ArticleService {
    articles: Arc<dyn ArticleRepository>,
    tags: Arc<dyn TagRepository>,
    likes: Arc<dyn LikeRepository>,
    users: Arc<dyn UserRepository>,
    slugs: SlugAllocator,
}

impl ArticleService {
    /// Create a new article service
    pub fn new(
        articles: Arc<dyn ArticleRepository>,
        tags: Arc<dyn TagRepository>,
        likes: Arc<dyn LikeRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        let slugs = SlugAllocator::new(articles.clone());
        Self {
            articles,
            tags,
            likes,
            users,
            slugs,
        }
    }

    /// Create a new article for the authenticated caller.
    ///
    /// Allocates a unique slug from the title, stores the article
    /// (publishing stamps `published_at`), and attaches the tags,
    /// creating missing ones lazily.
    pub async fn create(
        &self,
        input: CreateArticleInput,
        session: Option<&SessionUser>,
    ) -> Result<Article, ArticleServiceError> {
        let session = session.ok_or(ArticleServiceError::Unauthorized)?;

        validate_title(&input.title)?;
        validate_body(&input.body)?;
        let tag_names = normalize_tags(&input.tags)?;

        let slug = self
            .slugs
            .allocate(&input.title)
            .await
            .context("Failed to allocate slug")?;

        let new_article = NewArticle {
            slug: slug.clone(),
            title: input.title,
            body: input.body,
            author_id: session.user_id,
            status: input.status,
        };

        let article = match self.articles.create(&new_article).await {
            Ok(article) => article,
            Err(e) => {
                // A concurrent insert can win the allocated slug between
                // the probe and the insert; re-check to surface it as a
                // conflict rather than an opaque failure.
                if self.articles.exists_by_slug(&slug).await.unwrap_or(false) {
                    return Err(ArticleServiceError::DuplicateSlug(slug));
                }
                return Err(ArticleServiceError::Internal(e));
            }
        };

        self.attach_tags(article.id, &tag_names).await?;

        Ok(article)
    }

    /// Full article detail for an article page.
    ///
    /// Includes the attached tags and whether the viewer has liked it.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        viewer: Option<&SessionUser>,
    ) -> Result<ArticleDetail, ArticleServiceError> {
        let article = self
            .articles
            .get_by_slug(slug)
            .await
            .context("Failed to load article")?
            .ok_or_else(|| ArticleServiceError::NotFound(slug.to_string()))?;

        // Drafts are visible only to their author
        if article.status == ArticleStatus::Draft
            && viewer.map(|v| v.user_id) != Some(article.author_id)
        {
            return Err(ArticleServiceError::NotFound(slug.to_string()));
        }

        let tags = self
            .tags
            .for_article(article.id)
            .await
            .context("Failed to load tags")?;

        let liked_by_viewer = match viewer {
            Some(viewer) => self
                .likes
                .is_liked(viewer.user_id, article.id)
                .await
                .context("Failed to check like state")?,
            None => false,
        };

        Ok(ArticleDetail {
            article,
            tags,
            liked_by_viewer,
        })
    }

    /// Update an article. Author-only.
    ///
    /// The slug is re-allocated only when the title actually changed;
    /// `published_at` is stamped on the first transition to published and
    /// preserved afterwards. When tags are given they replace the
    /// article's tag set.
    pub async fn update(
        &self,
        article_id: i64,
        input: UpdateArticleInput,
        session: Option<&SessionUser>,
    ) -> Result<Article, ArticleServiceError> {
        let mut article = self.load_owned(article_id, session).await?;

        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        if let Some(body) = &input.body {
            validate_body(body)?;
        }
        let tag_names = match &input.tags {
            Some(tags) => Some(normalize_tags(tags)?),
            None => None,
        };

        if let Some(title) = input.title {
            if title != article.title {
                article.slug = self
                    .slugs
                    .allocate_for_update(&title, article.id)
                    .await
                    .context("Failed to allocate slug")?;
                article.title = title;
            }
        }
        if let Some(body) = input.body {
            article.body = body;
        }
        if let Some(status) = input.status {
            if status == ArticleStatus::Published && article.published_at.is_none() {
                article.published_at = Some(Utc::now());
            }
            article.status = status;
        }

        self.articles
            .update(&article)
            .await
            .context("Failed to update article")?;

        if let Some(tag_names) = tag_names {
            self.tags
                .detach_all(article.id)
                .await
                .context("Failed to clear tags")?;
            self.attach_tags(article.id, &tag_names).await?;
        }

        self.articles
            .get_by_id(article.id)
            .await
            .context("Failed to reload article")?
            .ok_or_else(|| ArticleServiceError::NotFound(article_id.to_string()))
    }

    /// Delete an article. Author-only; tags and likes cascade.
    pub async fn delete(
        &self,
        article_id: i64,
        session: Option<&SessionUser>,
    ) -> Result<(), ArticleServiceError> {
        let article = self.load_owned(article_id, session).await?;

        self.articles
            .delete(article.id)
            .await
            .context("Failed to delete article")?;

        Ok(())
    }

    /// Flip an article between draft and published. Author-only.
    ///
    /// `published_at` is set exactly once, on the first publish, and is
    /// neither cleared on unpublish nor reset on a later republish.
    pub async fn toggle_status(
        &self,
        article_id: i64,
        session: Option<&SessionUser>,
    ) -> Result<Article, ArticleServiceError> {
        let mut article = self.load_owned(article_id, session).await?;

        article.status = match article.status {
            ArticleStatus::Draft => ArticleStatus::Published,
            ArticleStatus::Published => ArticleStatus::Draft,
        };
        if article.status == ArticleStatus::Published && article.published_at.is_none() {
            article.published_at = Some(Utc::now());
        }

        self.articles
            .update(&article)
            .await
            .context("Failed to update article status")?;

        Ok(article)
    }

    /// The public feed: published articles, newest publication first.
    pub async fn published_feed(
        &self,
        params: &FeedParams,
    ) -> Result<FeedPage<Article>, ArticleServiceError> {
        let rows = self
            .articles
            .list_published(params.offset(), params.fetch_limit())
            .await
            .context("Failed to load published feed")?;

        Ok(FeedPage::from_overfetch(rows, params))
    }

    /// Case-insensitive contains-search over title, body, and slug of
    /// published articles. A blank query yields an empty page.
    pub async fn search_feed(
        &self,
        query: &str,
        params: &FeedParams,
    ) -> Result<FeedPage<Article>, ArticleServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(FeedPage {
                items: Vec::new(),
                has_more: false,
            });
        }

        let rows = self
            .articles
            .search_published(query, params.offset(), params.fetch_limit())
            .await
            .context("Failed to search articles")?;

        Ok(FeedPage::from_overfetch(rows, params))
    }

    /// Published articles under a tag, with the tag's total count.
    pub async fn tag_feed(
        &self,
        tag_name: &str,
        params: &FeedParams,
    ) -> Result<TagFeedPage, ArticleServiceError> {
        let tag_name = tag_name.trim().to_lowercase();

        let rows = self
            .articles
            .list_published_by_tag(&tag_name, params.offset(), params.fetch_limit())
            .await
            .context("Failed to load tag feed")?;

        let count = self
            .articles
            .count_published_by_tag(&tag_name)
            .await
            .context("Failed to count tag feed")?;

        let page = FeedPage::from_overfetch(rows, params);
        Ok(TagFeedPage {
            items: page.items,
            has_more: page.has_more,
            count,
        })
    }

    /// Articles by one author, newest creation first. Drafts appear only
    /// when the viewer is that author.
    pub async fn author_feed(
        &self,
        username: &str,
        viewer: Option<&SessionUser>,
        params: &FeedParams,
    ) -> Result<FeedPage<Article>, ArticleServiceError> {
        let author = self
            .users
            .get_by_username(&username.to_lowercase())
            .await
            .context("Failed to look up author")?
            .ok_or_else(|| ArticleServiceError::NotFound(username.to_string()))?;

        let include_drafts = viewer.map(|v| v.user_id) == Some(author.id);

        let rows = self
            .articles
            .list_by_author(author.id, include_drafts, params.offset(), params.fetch_limit())
            .await
            .context("Failed to load author feed")?;

        Ok(FeedPage::from_overfetch(rows, params))
    }

    /// Load an article and verify the caller owns it.
    async fn load_owned(
        &self,
        article_id: i64,
        session: Option<&SessionUser>,
    ) -> Result<Article, ArticleServiceError> {
        let session = session.ok_or(ArticleServiceError::Unauthorized)?;

        let article = self
            .articles
            .get_by_id(article_id)
            .await
            .context("Failed to load article")?
            .ok_or_else(|| ArticleServiceError::NotFound(article_id.to_string()))?;

        if article.author_id != session.user_id {
            return Err(ArticleServiceError::Unauthorized);
        }

        Ok(article)
    }

    /// Find-or-create every tag and attach it to the article.
    async fn attach_tags(
        &self,
        article_id: i64,
        tag_names: &[String],
    ) -> Result<(), ArticleServiceError> {
        for name in tag_names {
            let tag = self
                .tags
                .find_or_create(name)
                .await
                .context("Failed to find or create tag")?;
            self.tags
                .attach(tag.id, article_id)
                .await
                .context("Failed to attach tag")?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), ArticleServiceError> {
    if title.trim().is_empty() {
        return Err(ArticleServiceError::Validation(
            "Title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(ArticleServiceError::Validation(format!(
            "Title is longer than {} characters",
            TITLE_MAX
        )));
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<(), ArticleServiceError> {
    if body.trim().is_empty() {
        return Err(ArticleServiceError::Validation(
            "Body cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn normalize_tags(tags: &[String]) -> Result<Vec<String>, ArticleServiceError> {
    if tags.len() > MAX_ARTICLE_TAGS {
        return Err(ArticleServiceError::Validation(format!(
            "At most {} tags per article",
            MAX_ARTICLE_TAGS
        )));
    }

    tags.iter()
        .map(|name| {
            normalize_tag(name)
                .ok_or_else(|| ArticleServiceError::Validation(format!("Invalid tag: {}", name)))
        })
        .collect()
}
