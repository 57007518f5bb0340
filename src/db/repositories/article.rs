//! Article repository
//!
//! Database operations for articles: CRUD, slug existence probes, the
//! atomic view-count increment, and the feed queries. Feed queries take a
//! raw offset/limit so the service layer can over-fetch one row to detect
//! further pages.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Article, ArticleStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Insert payload for a new article. The slug is allocated by the caller;
/// `published_at` is derived from the status at insert time.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub author_id: i64,
    pub status: ArticleStatus,
}

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert a new article
    async fn create(&self, article: &NewArticle) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Persist a modified article (slug, title, body, status, published_at)
    async fn update(&self, article: &Article) -> Result<()>;

    /// Delete an article (tags and likes cascade)
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a slug is already taken
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Check if a slug is taken by a different article (for updates)
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool>;

    /// Published articles, newest publication first
    async fn list_published(&self, offset: i64, limit: i64) -> Result<Vec<Article>>;

    /// Case-insensitive contains-search over title, body, and slug of
    /// published articles
    async fn search_published(&self, keyword: &str, offset: i64, limit: i64)
        -> Result<Vec<Article>>;

    /// Published articles carrying the given tag
    async fn list_published_by_tag(
        &self,
        tag_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>>;

    /// Total published articles carrying the given tag
    async fn count_published_by_tag(&self, tag_name: &str) -> Result<i64>;

    /// Articles by one author, newest creation first. Drafts are included
    /// only when `include_drafts` is set.
    async fn list_by_author(
        &self,
        author_id: i64,
        include_drafts: bool,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>>;

    /// Atomically bump the view counter by one. Returns the new count, or
    /// `None` when the article does not exist.
    async fn increment_views(&self, id: i64) -> Result<Option<i64>>;
}

/// SQLx-based article repository implementation.
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &NewArticle) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_article_sqlite(self.pool.as_sqlite().unwrap(), article).await
            }
            DatabaseDriver::Mysql => {
                create_article_mysql(self.pool.as_mysql().unwrap(), article).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_article_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_article_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_article_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_article_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn update(&self, article: &Article) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_article_sqlite(self.pool.as_sqlite().unwrap(), article).await
            }
            DatabaseDriver::Mysql => {
                update_article_mysql(self.pool.as_mysql().unwrap(), article).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_article_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_article_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => exists_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await,
        }
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_excluding_sqlite(self.pool.as_sqlite().unwrap(), slug, exclude_id)
                    .await
            }
            DatabaseDriver::Mysql => {
                exists_by_slug_excluding_mysql(self.pool.as_mysql().unwrap(), slug, exclude_id)
                    .await
            }
        }
    }

    async fn list_published(&self, offset: i64, limit: i64) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_sqlite(self.pool.as_sqlite().unwrap(), offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_published_mysql(self.pool.as_mysql().unwrap(), offset, limit).await
            }
        }
    }

    async fn search_published(
        &self,
        keyword: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                search_published_sqlite(self.pool.as_sqlite().unwrap(), keyword, offset, limit)
                    .await
            }
            DatabaseDriver::Mysql => {
                search_published_mysql(self.pool.as_mysql().unwrap(), keyword, offset, limit).await
            }
        }
    }

    async fn list_published_by_tag(
        &self,
        tag_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_by_tag_sqlite(self.pool.as_sqlite().unwrap(), tag_name, offset, limit)
                    .await
            }
            DatabaseDriver::Mysql => {
                list_published_by_tag_mysql(self.pool.as_mysql().unwrap(), tag_name, offset, limit)
                    .await
            }
        }
    }

    async fn count_published_by_tag(&self, tag_name: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_published_by_tag_sqlite(self.pool.as_sqlite().unwrap(), tag_name).await
            }
            DatabaseDriver::Mysql => {
                count_published_by_tag_mysql(self.pool.as_mysql().unwrap(), tag_name).await
            }
        }
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        include_drafts: bool,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_author_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    author_id,
                    include_drafts,
                    offset,
                    limit,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                list_by_author_mysql(
                    self.pool.as_mysql().unwrap(),
                    author_id,
                    include_drafts,
                    offset,
                    limit,
                )
                .await
            }
        }
    }

    async fn increment_views(&self, id: i64) -> Result<Option<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                increment_views_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => increment_views_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const ARTICLE_COLUMNS: &str =
    "id, slug, title, body, author_id, status, likes, views, published_at, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(pool: &SqlitePool, article: &NewArticle) -> Result<Article> {
    let now = Utc::now();
    let published_at = if article.status == ArticleStatus::Published {
        Some(now)
    } else {
        None
    };

    let result = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, body, author_id, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.body)
    .bind(article.author_id)
    .bind(article.status.as_str())
    .bind(published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    let id = result.last_insert_rowid();

    Ok(Article {
        id,
        slug: article.slug.clone(),
        title: article.title.clone(),
        body: article.body.clone(),
        author_id: article.author_id,
        status: article.status,
        likes: 0,
        views: 0,
        published_at,
        created_at: now,
        updated_at: now,
    })
}

async fn get_article_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM articles WHERE id = ?",
        ARTICLE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get article by ID")?;

    row.map(|r| row_to_article_sqlite(&r)).transpose()
}

async fn get_article_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Article>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM articles WHERE slug = ?",
        ARTICLE_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get article by slug")?;

    row.map(|r| row_to_article_sqlite(&r)).transpose()
}

async fn update_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE articles
        SET slug = ?, title = ?, body = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.body)
    .bind(article.status.as_str())
    .bind(article.published_at)
    .bind(now)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("Article {} not found for update", article.id);
    }

    Ok(())
}

async fn delete_article_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // article_tags and article_likes rows go with it via ON DELETE CASCADE
    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete article")?;

    Ok(())
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check slug existence")?;

    Ok(count > 0)
}

async fn exists_by_slug_excluding_sqlite(
    pool: &SqlitePool,
    slug: &str,
    exclude_id: i64,
) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE slug = ? AND id != ?")
            .bind(slug)
            .bind(exclude_id)
            .fetch_one(pool)
            .await
            .context("Failed to check slug existence")?;

    Ok(count > 0)
}

async fn list_published_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM articles
        WHERE status = 'published'
        ORDER BY published_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        ARTICLE_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list published articles")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

async fn search_published_sqlite(
    pool: &SqlitePool,
    keyword: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let pattern = format!("%{}%", keyword.to_lowercase());

    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM articles
        WHERE status = 'published'
          AND (LOWER(title) LIKE ? OR LOWER(body) LIKE ? OR LOWER(slug) LIKE ?)
        ORDER BY published_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        ARTICLE_COLUMNS
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to search articles")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

async fn list_published_by_tag_sqlite(
    pool: &SqlitePool,
    tag_name: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.slug, a.title, a.body, a.author_id, a.status, a.likes, a.views,
               a.published_at, a.created_at, a.updated_at
        FROM articles a
        INNER JOIN article_tags at ON a.id = at.article_id
        INNER JOIN tags t ON t.id = at.tag_id
        WHERE t.name = ? AND a.status = 'published'
        ORDER BY a.published_at DESC, a.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(tag_name)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list articles by tag")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

async fn count_published_by_tag_sqlite(pool: &SqlitePool, tag_name: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM articles a
        INNER JOIN article_tags at ON a.id = at.article_id
        INNER JOIN tags t ON t.id = at.tag_id
        WHERE t.name = ? AND a.status = 'published'
        "#,
    )
    .bind(tag_name)
    .fetch_one(pool)
    .await
    .context("Failed to count articles by tag")?;

    Ok(count)
}

async fn list_by_author_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    include_drafts: bool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let query = if include_drafts {
        format!(
            r#"
            SELECT {}
            FROM articles
            WHERE author_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            ARTICLE_COLUMNS
        )
    } else {
        format!(
            r#"
            SELECT {}
            FROM articles
            WHERE author_id = ? AND status = 'published'
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            ARTICLE_COLUMNS
        )
    };

    let rows = sqlx::query(&query)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list articles by author")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

async fn increment_views_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<i64>> {
    // Atomic in-place increment; never read-modify-write
    let views: Option<i64> =
        sqlx::query_scalar("UPDATE articles SET views = views + 1 WHERE id = ? RETURNING views")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to increment view count")?;

    Ok(views)
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let status_str: String = row.get("status");
    let status = ArticleStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid article status: {}", status_str))?;

    Ok(Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        body: row.get("body"),
        author_id: row.get("author_id"),
        status,
        likes: row.get("likes"),
        views: row.get("views"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(pool: &MySqlPool, article: &NewArticle) -> Result<Article> {
    let now = Utc::now();
    let published_at = if article.status == ArticleStatus::Published {
        Some(now)
    } else {
        None
    };

    let result = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, body, author_id, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.body)
    .bind(article.author_id)
    .bind(article.status.as_str())
    .bind(published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    let id = result.last_insert_id() as i64;

    Ok(Article {
        id,
        slug: article.slug.clone(),
        title: article.title.clone(),
        body: article.body.clone(),
        author_id: article.author_id,
        status: article.status,
        likes: 0,
        views: 0,
        published_at,
        created_at: now,
        updated_at: now,
    })
}

async fn get_article_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM articles WHERE id = ?",
        ARTICLE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get article by ID")?;

    row.map(|r| row_to_article_mysql(&r)).transpose()
}

async fn get_article_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Article>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM articles WHERE slug = ?",
        ARTICLE_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get article by slug")?;

    row.map(|r| row_to_article_mysql(&r)).transpose()
}

async fn update_article_mysql(pool: &MySqlPool, article: &Article) -> Result<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE articles
        SET slug = ?, title = ?, body = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.slug)
    .bind(&article.title)
    .bind(&article.body)
    .bind(article.status.as_str())
    .bind(article.published_at)
    .bind(now)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("Article {} not found for update", article.id);
    }

    Ok(())
}

async fn delete_article_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete article")?;

    Ok(())
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check slug existence")?;

    Ok(count > 0)
}

async fn exists_by_slug_excluding_mysql(
    pool: &MySqlPool,
    slug: &str,
    exclude_id: i64,
) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE slug = ? AND id != ?")
            .bind(slug)
            .bind(exclude_id)
            .fetch_one(pool)
            .await
            .context("Failed to check slug existence")?;

    Ok(count > 0)
}

async fn list_published_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM articles
        WHERE status = 'published'
        ORDER BY published_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        ARTICLE_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list published articles")?;

    rows.iter().map(row_to_article_mysql).collect()
}

async fn search_published_mysql(
    pool: &MySqlPool,
    keyword: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let pattern = format!("%{}%", keyword.to_lowercase());

    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM articles
        WHERE status = 'published'
          AND (LOWER(title) LIKE ? OR LOWER(body) LIKE ? OR LOWER(slug) LIKE ?)
        ORDER BY published_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        ARTICLE_COLUMNS
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to search articles")?;

    rows.iter().map(row_to_article_mysql).collect()
}

async fn list_published_by_tag_mysql(
    pool: &MySqlPool,
    tag_name: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.slug, a.title, a.body, a.author_id, a.status, a.likes, a.views,
               a.published_at, a.created_at, a.updated_at
        FROM articles a
        INNER JOIN article_tags at ON a.id = at.article_id
        INNER JOIN tags t ON t.id = at.tag_id
        WHERE t.name = ? AND a.status = 'published'
        ORDER BY a.published_at DESC, a.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(tag_name)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list articles by tag")?;

    rows.iter().map(row_to_article_mysql).collect()
}

async fn count_published_by_tag_mysql(pool: &MySqlPool, tag_name: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM articles a
        INNER JOIN article_tags at ON a.id = at.article_id
        INNER JOIN tags t ON t.id = at.tag_id
        WHERE t.name = ? AND a.status = 'published'
        "#,
    )
    .bind(tag_name)
    .fetch_one(pool)
    .await
    .context("Failed to count articles by tag")?;

    Ok(count)
}

async fn list_by_author_mysql(
    pool: &MySqlPool,
    author_id: i64,
    include_drafts: bool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let query = if include_drafts {
        format!(
            r#"
            SELECT {}
            FROM articles
            WHERE author_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            ARTICLE_COLUMNS
        )
    } else {
        format!(
            r#"
            SELECT {}
            FROM articles
            WHERE author_id = ? AND status = 'published'
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            ARTICLE_COLUMNS
        )
    };

    let rows = sqlx::query(&query)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list articles by author")?;

    rows.iter().map(row_to_article_mysql).collect()
}

async fn increment_views_mysql(pool: &MySqlPool, id: i64) -> Result<Option<i64>> {
    // MySQL has no RETURNING; update and read back inside one transaction
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin view-increment transaction")?;

    let result = sqlx::query("UPDATE articles SET views = views + 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to increment view count")?;

    if result.rows_affected() == 0 {
        tx.rollback().await.ok();
        return Ok(None);
    }

    let views: i64 = sqlx::query_scalar("SELECT views FROM articles WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read view count")?;

    tx.commit()
        .await
        .context("Failed to commit view-increment transaction")?;

    Ok(Some(views))
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    let status_str: String = row.get("status");
    let status = ArticleStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid article status: {}", status_str))?;

    Ok(Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        body: row.get("body"),
        author_id: row.get("author_id"),
        status,
        likes: row.get("likes"),
        views: row.get("views"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DynDatabasePool, SqlxArticleRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let author_id = create_test_user(pool.as_sqlite().unwrap(), "author").await;
        let repo = SqlxArticleRepository::new(pool.clone());
        (pool, repo, author_id)
    }

    async fn create_test_user(pool: &SqlitePool, username: &str) -> i64 {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind("hash123")
        .execute(pool)
        .await
        .expect("Failed to create test user");
        result.last_insert_rowid()
    }

    fn new_article(slug: &str, title: &str, author_id: i64, status: ArticleStatus) -> NewArticle {
        NewArticle {
            slug: slug.to_string(),
            title: title.to_string(),
            body: format!("Body for {}", title),
            author_id,
            status,
        }
    }

    #[tokio::test]
    async fn test_create_draft_article() {
        let (_pool, repo, author_id) = setup().await;

        let created = repo
            .create(&new_article("first", "First", author_id, ArticleStatus::Draft))
            .await
            .expect("Failed to create article");

        assert!(created.id > 0);
        assert_eq!(created.slug, "first");
        assert_eq!(created.status, ArticleStatus::Draft);
        assert!(created.published_at.is_none());
        assert_eq!(created.likes, 0);
        assert_eq!(created.views, 0);
    }

    #[tokio::test]
    async fn test_create_published_article_sets_published_at() {
        let (_pool, repo, author_id) = setup().await;

        let created = repo
            .create(&new_article("live", "Live", author_id, ArticleStatus::Published))
            .await
            .unwrap();

        assert_eq!(created.status, ArticleStatus::Published);
        assert!(created.published_at.is_some());
    }

    #[tokio::test]
    async fn test_get_by_id_and_slug() {
        let (_pool, repo, author_id) = setup().await;

        let created = repo
            .create(&new_article("lookup", "Lookup", author_id, ArticleStatus::Draft))
            .await
            .unwrap();

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.slug, "lookup");

        let by_slug = repo.get_by_slug("lookup").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);

        assert!(repo.get_by_id(9999).await.unwrap().is_none());
        assert!(repo.get_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_article() {
        let (_pool, repo, author_id) = setup().await;

        let mut article = repo
            .create(&new_article("orig", "Orig", author_id, ArticleStatus::Draft))
            .await
            .unwrap();

        article.title = "Renamed".to_string();
        article.slug = "renamed".to_string();
        article.status = ArticleStatus::Published;
        article.published_at = Some(Utc::now());
        repo.update(&article).await.unwrap();

        let reloaded = repo.get_by_id(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Renamed");
        assert_eq!(reloaded.slug, "renamed");
        assert_eq!(reloaded.status, ArticleStatus::Published);
        assert!(reloaded.published_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_article() {
        let (_pool, repo, author_id) = setup().await;

        let created = repo
            .create(&new_article("gone", "Gone", author_id, ArticleStatus::Draft))
            .await
            .unwrap();

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_by_slug() {
        let (_pool, repo, author_id) = setup().await;

        assert!(!repo.exists_by_slug("taken").await.unwrap());

        repo.create(&new_article("taken", "Taken", author_id, ArticleStatus::Draft))
            .await
            .unwrap();

        assert!(repo.exists_by_slug("taken").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_by_slug_excluding() {
        let (_pool, repo, author_id) = setup().await;

        let first = repo
            .create(&new_article("one", "One", author_id, ArticleStatus::Draft))
            .await
            .unwrap();
        let second = repo
            .create(&new_article("two", "Two", author_id, ArticleStatus::Draft))
            .await
            .unwrap();

        // "one" is taken relative to the second article
        assert!(repo.exists_by_slug_excluding("one", second.id).await.unwrap());
        // but not relative to its own row
        assert!(!repo.exists_by_slug_excluding("one", first.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_published_excludes_drafts() {
        let (_pool, repo, author_id) = setup().await;

        repo.create(&new_article("draft-1", "Draft 1", author_id, ArticleStatus::Draft))
            .await
            .unwrap();
        for i in 1..=3 {
            repo.create(&new_article(
                &format!("pub-{}", i),
                &format!("Pub {}", i),
                author_id,
                ArticleStatus::Published,
            ))
            .await
            .unwrap();
        }

        let listed = repo.list_published(0, 10).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|a| a.status == ArticleStatus::Published));
    }

    #[tokio::test]
    async fn test_list_published_ordering_is_stable() {
        let (_pool, repo, author_id) = setup().await;

        // Same-instant publications are common in tests; the id tiebreak
        // keeps the order deterministic.
        for i in 1..=5 {
            repo.create(&new_article(
                &format!("a-{}", i),
                &format!("A {}", i),
                author_id,
                ArticleStatus::Published,
            ))
            .await
            .unwrap();
        }

        let listed = repo.list_published(0, 10).await.unwrap();
        for pair in listed.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let a_key = (a.published_at.unwrap(), a.id);
            let b_key = (b.published_at.unwrap(), b.id);
            assert!(a_key >= b_key, "feed must be ordered published_at DESC, id DESC");
        }
    }

    #[tokio::test]
    async fn test_search_published_is_case_insensitive() {
        let (_pool, repo, author_id) = setup().await;

        repo.create(&NewArticle {
            slug: "rust-tips".to_string(),
            title: "Rust Tips".to_string(),
            body: "Practical BORROW checker advice".to_string(),
            author_id,
            status: ArticleStatus::Published,
        })
        .await
        .unwrap();
        repo.create(&new_article("other", "Other", author_id, ArticleStatus::Published))
            .await
            .unwrap();

        let by_title = repo.search_published("rUsT", 0, 10).await.unwrap();
        assert_eq!(by_title.len(), 1);

        let by_body = repo.search_published("borrow", 0, 10).await.unwrap();
        assert_eq!(by_body.len(), 1);

        let by_slug = repo.search_published("rust-tips", 0, 10).await.unwrap();
        assert_eq!(by_slug.len(), 1);

        let none = repo.search_published("zzz", 0, 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_search_excludes_drafts() {
        let (_pool, repo, author_id) = setup().await;

        repo.create(&new_article("secret", "Secret Draft", author_id, ArticleStatus::Draft))
            .await
            .unwrap();

        let found = repo.search_published("secret", 0, 10).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_list_by_author_draft_visibility() {
        let (pool, repo, author_id) = setup().await;
        let other_id = create_test_user(pool.as_sqlite().unwrap(), "other").await;

        repo.create(&new_article("mine-draft", "Mine Draft", author_id, ArticleStatus::Draft))
            .await
            .unwrap();
        repo.create(&new_article("mine-pub", "Mine Pub", author_id, ArticleStatus::Published))
            .await
            .unwrap();
        repo.create(&new_article("theirs", "Theirs", other_id, ArticleStatus::Published))
            .await
            .unwrap();

        let with_drafts = repo.list_by_author(author_id, true, 0, 10).await.unwrap();
        assert_eq!(with_drafts.len(), 2);

        let public_only = repo.list_by_author(author_id, false, 0, 10).await.unwrap();
        assert_eq!(public_only.len(), 1);
        assert_eq!(public_only[0].slug, "mine-pub");
    }

    #[tokio::test]
    async fn test_increment_views_is_atomic_and_counts() {
        let (_pool, repo, author_id) = setup().await;

        let article = repo
            .create(&new_article("viewed", "Viewed", author_id, ArticleStatus::Published))
            .await
            .unwrap();

        assert_eq!(repo.increment_views(article.id).await.unwrap(), Some(1));
        assert_eq!(repo.increment_views(article.id).await.unwrap(), Some(2));

        let reloaded = repo.get_by_id(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded.views, 2);
    }

    #[tokio::test]
    async fn test_increment_views_missing_article() {
        let (_pool, repo, _author_id) = setup().await;
        assert_eq!(repo.increment_views(424242).await.unwrap(), None);
    }
}
