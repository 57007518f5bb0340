//! Like toggling
//!
//! Idempotent like/unlike with an authoritative post-operation count.
//! The repository performs the row mutation and counter adjustment as one
//! transaction; this service maps its typed outcomes onto the error
//! taxonomy. The returned count is what a client reconciles its
//! optimistic UI state against.

use crate::db::repositories::{LikeOutcome, LikeRepository, UnlikeOutcome};
use crate::models::SessionUser;
use anyhow::Context;
use std::sync::Arc;

/// Error types for like service operations
#[derive(Debug, thiserror::Error)]
pub enum LikeServiceError {
    /// Referenced article does not exist
    #[error("Article not found")]
    ArticleNotFound,

    /// The user already likes this article
    #[error("Article already liked")]
    AlreadyLiked,

    /// The user does not like this article
    #[error("Article not liked")]
    NotLiked,

    /// Dependency failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Like service
pub struct LikeService {
    likes: Arc<dyn LikeRepository>,
}

impl LikeService {
    /// Create a new like service
    pub fn new(likes: Arc<dyn LikeRepository>) -> Self {
        Self { likes }
    }

    /// Record a like. Returns the authoritative post-operation count.
    pub async fn like(
        &self,
        user: &SessionUser,
        article_id: i64,
    ) -> Result<i64, LikeServiceError> {
        let outcome = self
            .likes
            .like(user.user_id, article_id)
            .await
            .context("Failed to record like")?;

        match outcome {
            LikeOutcome::Liked { likes } => Ok(likes),
            LikeOutcome::AlreadyLiked => Err(LikeServiceError::AlreadyLiked),
            LikeOutcome::ArticleMissing => Err(LikeServiceError::ArticleNotFound),
        }
    }

    /// Withdraw a like. Returns the authoritative post-operation count.
    pub async fn unlike(
        &self,
        user: &SessionUser,
        article_id: i64,
    ) -> Result<i64, LikeServiceError> {
        let outcome = self
            .likes
            .unlike(user.user_id, article_id)
            .await
            .context("Failed to withdraw like")?;

        match outcome {
            UnlikeOutcome::Unliked { likes } => Ok(likes),
            UnlikeOutcome::NotLiked => Err(LikeServiceError::NotLiked),
            UnlikeOutcome::ArticleMissing => Err(LikeServiceError::ArticleNotFound),
        }
    }

    /// Whether the user currently likes the article
    pub async fn is_liked(
        &self,
        user: &SessionUser,
        article_id: i64,
    ) -> Result<bool, LikeServiceError> {
        let liked = self
            .likes
            .is_liked(user.user_id, article_id)
            .await
            .context("Failed to check like state")?;
        Ok(liked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ArticleRepository, NewArticle, SqlxArticleRepository, SqlxLikeRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::ArticleStatus;

    async fn setup() -> (LikeService, SessionUser, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let user_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES ('fan', 'f@example.com', 'h')",
        )
        .execute(pool.as_sqlite().unwrap())
        .await
        .unwrap()
        .last_insert_rowid();

        let articles = SqlxArticleRepository::new(pool.clone());
        let article = articles
            .create(&NewArticle {
                slug: "likeable".to_string(),
                title: "Likeable".to_string(),
                body: "Body".to_string(),
                author_id: user_id,
                status: ArticleStatus::Published,
            })
            .await
            .unwrap();

        let service = LikeService::new(Arc::new(SqlxLikeRepository::new(pool)));
        (service, SessionUser::new(user_id, "fan"), article.id)
    }

    #[tokio::test]
    async fn test_like_then_double_like() {
        let (service, user, article_id) = setup().await;

        assert_eq!(service.like(&user, article_id).await.unwrap(), 1);

        let second = service.like(&user, article_id).await;
        assert!(matches!(second, Err(LikeServiceError::AlreadyLiked)));

        // Count unchanged after the rejected duplicate
        assert!(service.is_liked(&user, article_id).await.unwrap());
        assert_eq!(
            service.unlike(&user, article_id).await.unwrap(),
            0,
            "unlike returns the count to its pre-like value"
        );
    }

    #[tokio::test]
    async fn test_unlike_without_like() {
        let (service, user, article_id) = setup().await;

        let result = service.unlike(&user, article_id).await;
        assert!(matches!(result, Err(LikeServiceError::NotLiked)));
    }

    #[tokio::test]
    async fn test_missing_article() {
        let (service, user, _article_id) = setup().await;

        assert!(matches!(
            service.like(&user, 999_999).await,
            Err(LikeServiceError::ArticleNotFound)
        ));
        assert!(matches!(
            service.unlike(&user, 999_999).await,
            Err(LikeServiceError::ArticleNotFound)
        ));
    }
}
