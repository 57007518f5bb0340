//! Tag repository
//!
//! Tags are created lazily: `find_or_create` is an insert-ignore followed
//! by a lookup, so concurrent creators of the same name converge on one
//! row instead of racing on the uniqueness constraint.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get an existing tag by name or create it
    async fn find_or_create(&self, name: &str) -> Result<Tag>;

    /// Get tag by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// Attach a tag to an article (no-op if already attached)
    async fn attach(&self, tag_id: i64, article_id: i64) -> Result<()>;

    /// Remove every tag from an article
    async fn detach_all(&self, article_id: i64) -> Result<()>;

    /// Tags attached to an article, in name order
    async fn for_article(&self, article_id: i64) -> Result<Vec<Tag>>;

    /// Tags ordered by published-article count descending
    async fn popular(&self, limit: i64) -> Result<Vec<TagWithCount>>;

    /// Case-insensitive contains-search over tag names
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn find_or_create(&self, name: &str) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_or_create_sqlite(self.pool.as_sqlite().unwrap(), name).await
            }
            DatabaseDriver::Mysql => find_or_create_mysql(self.pool.as_mysql().unwrap(), name).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_name_sqlite(self.pool.as_sqlite().unwrap(), name).await,
            DatabaseDriver::Mysql => get_by_name_mysql(self.pool.as_mysql().unwrap(), name).await,
        }
    }

    async fn attach(&self, tag_id: i64, article_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                attach_sqlite(self.pool.as_sqlite().unwrap(), tag_id, article_id).await
            }
            DatabaseDriver::Mysql => {
                attach_mysql(self.pool.as_mysql().unwrap(), tag_id, article_id).await
            }
        }
    }

    async fn detach_all(&self, article_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                detach_all_sqlite(self.pool.as_sqlite().unwrap(), article_id).await
            }
            DatabaseDriver::Mysql => {
                detach_all_mysql(self.pool.as_mysql().unwrap(), article_id).await
            }
        }
    }

    async fn for_article(&self, article_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                for_article_sqlite(self.pool.as_sqlite().unwrap(), article_id).await
            }
            DatabaseDriver::Mysql => {
                for_article_mysql(self.pool.as_mysql().unwrap(), article_id).await
            }
        }
    }

    async fn popular(&self, limit: i64) -> Result<Vec<TagWithCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => popular_sqlite(self.pool.as_sqlite().unwrap(), limit).await,
            DatabaseDriver::Mysql => popular_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn search(&self, query: &str, limit: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                search_sqlite(self.pool.as_sqlite().unwrap(), query, limit).await
            }
            DatabaseDriver::Mysql => search_mysql(self.pool.as_mysql().unwrap(), query, limit).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn find_or_create_sqlite(pool: &SqlitePool, name: &str) -> Result<Tag> {
    sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to insert tag")?;

    get_by_name_sqlite(pool, name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Tag vanished after insert: {}", name))
}

async fn get_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, created_at FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    Ok(row.map(|r| row_to_tag_sqlite(&r)))
}

async fn attach_sqlite(pool: &SqlitePool, tag_id: i64, article_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
        .bind(article_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to attach tag to article")?;
    Ok(())
}

async fn detach_all_sqlite(pool: &SqlitePool, article_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(pool)
        .await
        .context("Failed to detach tags from article")?;
    Ok(())
}

async fn for_article_sqlite(pool: &SqlitePool, article_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.created_at
        FROM tags t
        INNER JOIN article_tags at ON t.id = at.tag_id
        WHERE at.article_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(article_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for article")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn popular_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<TagWithCount>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.created_at,
               COUNT(a.id) AS article_count
        FROM tags t
        LEFT JOIN article_tags at ON t.id = at.tag_id
        LEFT JOIN articles a ON a.id = at.article_id AND a.status = 'published'
        GROUP BY t.id, t.name, t.created_at
        ORDER BY article_count DESC, t.name
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list popular tags")?;

    Ok(rows
        .iter()
        .map(|row| TagWithCount {
            tag: row_to_tag_sqlite(row),
            article_count: row.get("article_count"),
        })
        .collect())
}

async fn search_sqlite(pool: &SqlitePool, query: &str, limit: i64) -> Result<Vec<Tag>> {
    let pattern = format!("%{}%", query.to_lowercase());

    let rows = sqlx::query(
        "SELECT id, name, created_at FROM tags WHERE LOWER(name) LIKE ? ORDER BY name LIMIT ?",
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to search tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn find_or_create_mysql(pool: &MySqlPool, name: &str) -> Result<Tag> {
    sqlx::query("INSERT IGNORE INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to insert tag")?;

    get_by_name_mysql(pool, name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Tag vanished after insert: {}", name))
}

async fn get_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, created_at FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    Ok(row.map(|r| row_to_tag_mysql(&r)))
}

async fn attach_mysql(pool: &MySqlPool, tag_id: i64, article_id: i64) -> Result<()> {
    sqlx::query("INSERT IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
        .bind(article_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to attach tag to article")?;
    Ok(())
}

async fn detach_all_mysql(pool: &MySqlPool, article_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(pool)
        .await
        .context("Failed to detach tags from article")?;
    Ok(())
}

async fn for_article_mysql(pool: &MySqlPool, article_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.created_at
        FROM tags t
        INNER JOIN article_tags at ON t.id = at.tag_id
        WHERE at.article_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(article_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for article")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn popular_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<TagWithCount>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.created_at,
               COUNT(a.id) AS article_count
        FROM tags t
        LEFT JOIN article_tags at ON t.id = at.tag_id
        LEFT JOIN articles a ON a.id = at.article_id AND a.status = 'published'
        GROUP BY t.id, t.name, t.created_at
        ORDER BY article_count DESC, t.name
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list popular tags")?;

    Ok(rows
        .iter()
        .map(|row| TagWithCount {
            tag: row_to_tag_mysql(row),
            article_count: row.get("article_count"),
        })
        .collect())
}

async fn search_mysql(pool: &MySqlPool, query: &str, limit: i64) -> Result<Vec<Tag>> {
    let pattern = format!("%{}%", query.to_lowercase());

    let rows = sqlx::query(
        "SELECT id, name, created_at FROM tags WHERE LOWER(name) LIKE ? ORDER BY name LIMIT ?",
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to search tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::article::{ArticleRepository, NewArticle, SqlxArticleRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::ArticleStatus;

    async fn setup() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_article(pool: &DynDatabasePool, slug: &str, status: ArticleStatus) -> i64 {
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query(
            "INSERT OR IGNORE INTO users (username, email, password_hash) VALUES ('t', 't@example.com', 'h')",
        )
        .execute(sqlite)
        .await
        .unwrap();

        let articles = SqlxArticleRepository::new(pool.clone());
        articles
            .create(&NewArticle {
                slug: slug.to_string(),
                title: slug.to_string(),
                body: "Body".to_string(),
                author_id: 1,
                status,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let (_pool, repo) = setup().await;

        let first = repo.find_or_create("rust").await.unwrap();
        let second = repo.find_or_create("rust").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "rust");
    }

    #[tokio::test]
    async fn test_get_by_name_missing() {
        let (_pool, repo) = setup().await;
        assert!(repo.get_by_name("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attach_and_for_article() {
        let (pool, repo) = setup().await;
        let article_id = create_article(&pool, "tagged", ArticleStatus::Published).await;

        let rust = repo.find_or_create("rust").await.unwrap();
        let web = repo.find_or_create("web").await.unwrap();
        repo.attach(rust.id, article_id).await.unwrap();
        repo.attach(web.id, article_id).await.unwrap();
        // Re-attaching is a no-op
        repo.attach(rust.id, article_id).await.unwrap();

        let tags = repo.for_article(article_id).await.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["rust", "web"]);
    }

    #[tokio::test]
    async fn test_detach_all() {
        let (pool, repo) = setup().await;
        let article_id = create_article(&pool, "untagged", ArticleStatus::Published).await;

        let tag = repo.find_or_create("temp").await.unwrap();
        repo.attach(tag.id, article_id).await.unwrap();
        repo.detach_all(article_id).await.unwrap();

        assert!(repo.for_article(article_id).await.unwrap().is_empty());
        // The tag itself survives detachment
        assert!(repo.get_by_name("temp").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_popular_orders_by_published_count() {
        let (pool, repo) = setup().await;
        let a1 = create_article(&pool, "p1", ArticleStatus::Published).await;
        let a2 = create_article(&pool, "p2", ArticleStatus::Published).await;
        let draft = create_article(&pool, "d1", ArticleStatus::Draft).await;

        let hot = repo.find_or_create("hot").await.unwrap();
        let cold = repo.find_or_create("cold").await.unwrap();
        repo.attach(hot.id, a1).await.unwrap();
        repo.attach(hot.id, a2).await.unwrap();
        repo.attach(cold.id, a1).await.unwrap();
        // Draft-only attachment does not count
        repo.attach(cold.id, draft).await.unwrap();

        let popular = repo.popular(10).await.unwrap();
        assert_eq!(popular[0].tag.name, "hot");
        assert_eq!(popular[0].article_count, 2);
        assert_eq!(popular[1].tag.name, "cold");
        assert_eq!(popular[1].article_count, 1);
    }

    #[tokio::test]
    async fn test_search_contains_case_insensitive() {
        let (_pool, repo) = setup().await;

        repo.find_or_create("rustlang").await.unwrap();
        repo.find_or_create("rocket").await.unwrap();

        let hits = repo.search("RUST", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "rustlang");
    }
}
