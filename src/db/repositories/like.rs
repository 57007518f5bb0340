//! Like repository
//!
//! Transactional like/unlike for articles. Each operation mutates the
//! like row and the denormalized `articles.likes` counter as one
//! transaction, so a crash mid-operation leaves either the pre-state or
//! the post-state and the counter never diverges from the row count.
//!
//! Duplicate detection is the affected-row count of an insert-ignore, a
//! typed outcome from the store layer rather than inspection of
//! constraint-violation errors.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, SqlitePool};
use std::sync::Arc;

/// Outcome of a like attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// Like recorded; carries the authoritative post-operation count
    Liked { likes: i64 },
    /// The (user, article) pair already had a like; nothing changed
    AlreadyLiked,
    /// The article does not exist
    ArticleMissing,
}

/// Outcome of an unlike attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlikeOutcome {
    /// Like removed; carries the authoritative post-operation count
    Unliked { likes: i64 },
    /// No like existed for the (user, article) pair; nothing changed
    NotLiked,
    /// The article does not exist
    ArticleMissing,
}

/// Like repository trait
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Record a like and bump the counter atomically
    async fn like(&self, user_id: i64, article_id: i64) -> Result<LikeOutcome>;

    /// Remove a like and drop the counter atomically
    async fn unlike(&self, user_id: i64, article_id: i64) -> Result<UnlikeOutcome>;

    /// Check whether the user has liked the article
    async fn is_liked(&self, user_id: i64, article_id: i64) -> Result<bool>;

    /// Number of like rows for an article (the source of truth behind the
    /// denormalized counter)
    async fn count_for_article(&self, article_id: i64) -> Result<i64>;
}

/// SQLx-based like repository implementation
pub struct SqlxLikeRepository {
    pool: DynDatabasePool,
}

impl SqlxLikeRepository {
    /// Create a new SQLx like repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn LikeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LikeRepository for SqlxLikeRepository {
    async fn like(&self, user_id: i64, article_id: i64) -> Result<LikeOutcome> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                like_sqlite(self.pool.as_sqlite().unwrap(), user_id, article_id).await
            }
            DatabaseDriver::Mysql => {
                like_mysql(self.pool.as_mysql().unwrap(), user_id, article_id).await
            }
        }
    }

    async fn unlike(&self, user_id: i64, article_id: i64) -> Result<UnlikeOutcome> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                unlike_sqlite(self.pool.as_sqlite().unwrap(), user_id, article_id).await
            }
            DatabaseDriver::Mysql => {
                unlike_mysql(self.pool.as_mysql().unwrap(), user_id, article_id).await
            }
        }
    }

    async fn is_liked(&self, user_id: i64, article_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                is_liked_sqlite(self.pool.as_sqlite().unwrap(), user_id, article_id).await
            }
            DatabaseDriver::Mysql => {
                is_liked_mysql(self.pool.as_mysql().unwrap(), user_id, article_id).await
            }
        }
    }

    async fn count_for_article(&self, article_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_for_article_sqlite(self.pool.as_sqlite().unwrap(), article_id).await
            }
            DatabaseDriver::Mysql => {
                count_for_article_mysql(self.pool.as_mysql().unwrap(), article_id).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn like_sqlite(pool: &SqlitePool, user_id: i64, article_id: i64) -> Result<LikeOutcome> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin like transaction")?;

    // Counter first: a zero row count tells us the article is gone before
    // touching the like row.
    let updated = sqlx::query("UPDATE articles SET likes = likes + 1 WHERE id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to increment like count")?;

    if updated.rows_affected() == 0 {
        tx.rollback().await.ok();
        return Ok(LikeOutcome::ArticleMissing);
    }

    let inserted =
        sqlx::query("INSERT OR IGNORE INTO article_likes (user_id, article_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to insert like row")?;

    if inserted.rows_affected() == 0 {
        // Duplicate pair; the counter bump rolls back with the transaction
        tx.rollback().await.ok();
        return Ok(LikeOutcome::AlreadyLiked);
    }

    let likes: i64 = sqlx::query_scalar("SELECT likes FROM articles WHERE id = ?")
        .bind(article_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read like count")?;

    tx.commit().await.context("Failed to commit like")?;

    Ok(LikeOutcome::Liked { likes })
}

async fn unlike_sqlite(pool: &SqlitePool, user_id: i64, article_id: i64) -> Result<UnlikeOutcome> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin unlike transaction")?;

    let deleted = sqlx::query("DELETE FROM article_likes WHERE user_id = ? AND article_id = ?")
        .bind(user_id)
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete like row")?;

    if deleted.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM articles WHERE id = ?")
            .bind(article_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to check article existence")?;
        tx.rollback().await.ok();
        return Ok(if exists.is_some() {
            UnlikeOutcome::NotLiked
        } else {
            UnlikeOutcome::ArticleMissing
        });
    }

    // The delete-guard above means the counter is positive here; the MAX
    // keeps it non-negative even against a historically skewed counter.
    sqlx::query("UPDATE articles SET likes = MAX(0, likes - 1) WHERE id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to decrement like count")?;

    let likes: i64 = sqlx::query_scalar("SELECT likes FROM articles WHERE id = ?")
        .bind(article_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read like count")?;

    tx.commit().await.context("Failed to commit unlike")?;

    Ok(UnlikeOutcome::Unliked { likes })
}

async fn is_liked_sqlite(pool: &SqlitePool, user_id: i64, article_id: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM article_likes WHERE user_id = ? AND article_id = ?",
    )
    .bind(user_id)
    .bind(article_id)
    .fetch_one(pool)
    .await
    .context("Failed to check like existence")?;

    Ok(count > 0)
}

async fn count_for_article_sqlite(pool: &SqlitePool, article_id: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM article_likes WHERE article_id = ?")
        .bind(article_id)
        .fetch_one(pool)
        .await
        .context("Failed to count likes")
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn like_mysql(pool: &MySqlPool, user_id: i64, article_id: i64) -> Result<LikeOutcome> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin like transaction")?;

    let updated = sqlx::query("UPDATE articles SET likes = likes + 1 WHERE id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to increment like count")?;

    if updated.rows_affected() == 0 {
        tx.rollback().await.ok();
        return Ok(LikeOutcome::ArticleMissing);
    }

    let inserted =
        sqlx::query("INSERT IGNORE INTO article_likes (user_id, article_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to insert like row")?;

    if inserted.rows_affected() == 0 {
        tx.rollback().await.ok();
        return Ok(LikeOutcome::AlreadyLiked);
    }

    let likes: i64 = sqlx::query_scalar("SELECT likes FROM articles WHERE id = ?")
        .bind(article_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read like count")?;

    tx.commit().await.context("Failed to commit like")?;

    Ok(LikeOutcome::Liked { likes })
}

async fn unlike_mysql(pool: &MySqlPool, user_id: i64, article_id: i64) -> Result<UnlikeOutcome> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin unlike transaction")?;

    let deleted = sqlx::query("DELETE FROM article_likes WHERE user_id = ? AND article_id = ?")
        .bind(user_id)
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete like row")?;

    if deleted.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM articles WHERE id = ?")
            .bind(article_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to check article existence")?;
        tx.rollback().await.ok();
        return Ok(if exists.is_some() {
            UnlikeOutcome::NotLiked
        } else {
            UnlikeOutcome::ArticleMissing
        });
    }

    sqlx::query("UPDATE articles SET likes = GREATEST(0, likes - 1) WHERE id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to decrement like count")?;

    let likes: i64 = sqlx::query_scalar("SELECT likes FROM articles WHERE id = ?")
        .bind(article_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read like count")?;

    tx.commit().await.context("Failed to commit unlike")?;

    Ok(UnlikeOutcome::Unliked { likes })
}

async fn is_liked_mysql(pool: &MySqlPool, user_id: i64, article_id: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM article_likes WHERE user_id = ? AND article_id = ?",
    )
    .bind(user_id)
    .bind(article_id)
    .fetch_one(pool)
    .await
    .context("Failed to check like existence")?;

    Ok(count > 0)
}

async fn count_for_article_mysql(pool: &MySqlPool, article_id: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM article_likes WHERE article_id = ?")
        .bind(article_id)
        .fetch_one(pool)
        .await
        .context("Failed to count likes")
}
