//! View counting
//!
//! Deduplicated, best-effort view counting. A SHA-256 fingerprint of
//! (client ip, agent string, article id) gates one counted view per
//! 24-hour window through a cache token; the persisted counter is bumped
//! with an atomic SQL increment.
//!
//! View counting is the one place where a cache outage is not an error:
//! the page must still render, so cache failures log a warning and the
//! view goes uncounted. Two in-flight requests from the same fingerprint
//! can both pass the gate before the token is visible and double-count;
//! that race is accepted for this counter.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::ArticleRepository;
use crate::models::ClientInfo;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Default dedup window: one counted view per fingerprint per 24 hours
const DEFAULT_VIEW_WINDOW: Duration = Duration::from_secs(60 * 60 * 24);

/// Cache key prefix for view-dedup tokens
const VIEW_KEY_PREFIX: &str = "view:";

/// Error types for view service operations
#[derive(Debug, thiserror::Error)]
pub enum ViewServiceError {
    /// Referenced article does not exist
    #[error("Article not found")]
    NotFound,

    /// Dependency failure (the cache is excluded; it fails open)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result of a view recording attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOutcome {
    /// Whether this request incremented the counter
    pub counted: bool,
    /// The article's current view count
    pub views: i64,
}

/// Compute the dedup fingerprint for a view request.
///
/// Distinct users behind one ip/agent pair collide and undercount; that
/// imprecision is part of the counter's contract.
pub fn view_fingerprint(ip: &str, user_agent: &str, article_id: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}-{}-{}", ip, user_agent, article_id));
    format!("{:x}", hasher.finalize())
}

/// View counting service
pub struct ViewService {
    articles: Arc<dyn ArticleRepository>,
    cache: Arc<Cache>,
    window: Duration,
}

impl ViewService {
    /// Create a view service with the default 24-hour window
    pub fn new(articles: Arc<dyn ArticleRepository>, cache: Arc<Cache>) -> Self {
        Self::with_window(articles, cache, DEFAULT_VIEW_WINDOW)
    }

    /// Create a view service with a custom dedup window
    pub fn with_window(
        articles: Arc<dyn ArticleRepository>,
        cache: Arc<Cache>,
        window: Duration,
    ) -> Self {
        Self {
            articles,
            cache,
            window,
        }
    }

    /// Record a view for an article.
    ///
    /// The first request per fingerprint within the window counts and
    /// increments the persisted total; repeats return `counted: false`
    /// with the unchanged total. The dedup token is written before the
    /// increment, so a failed increment can leave a view marked seen but
    /// uncounted (rare, accepted for a best-effort counter).
    pub async fn record_view(
        &self,
        article_id: i64,
        client: &ClientInfo,
    ) -> Result<ViewOutcome, ViewServiceError> {
        let fingerprint = view_fingerprint(&client.ip, &client.user_agent, article_id);
        let key = format!("{}{}", VIEW_KEY_PREFIX, fingerprint);

        match self.cache.get::<u8>(&key).await {
            Ok(Some(_)) => return self.uncounted(article_id).await,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("View-dedup cache read failed, skipping count: {:#}", e);
                return self.uncounted(article_id).await;
            }
        }

        if let Err(e) = self.cache.set(&key, &1u8, self.window).await {
            tracing::warn!("View-dedup cache write failed, skipping count: {:#}", e);
            return self.uncounted(article_id).await;
        }

        let views = self
            .articles
            .increment_views(article_id)
            .await
            .context("Failed to increment view count")?;

        match views {
            Some(views) => Ok(ViewOutcome {
                counted: true,
                views,
            }),
            None => Err(ViewServiceError::NotFound),
        }
    }

    /// Resolve the unchanged view count for an uncounted request.
    async fn uncounted(&self, article_id: i64) -> Result<ViewOutcome, ViewServiceError> {
        let article = self
            .articles
            .get_by_id(article_id)
            .await
            .context("Failed to load article")?;

        match article {
            Some(article) => Ok(ViewOutcome {
                counted: false,
                views: article.views,
            }),
            None => Err(ViewServiceError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{NewArticle, SqlxArticleRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::ArticleStatus;

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        let a = view_fingerprint("1.2.3.4", "Mozilla/5.0", 7);
        let b = view_fingerprint("1.2.3.4", "Mozilla/5.0", 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        assert_ne!(a, view_fingerprint("1.2.3.5", "Mozilla/5.0", 7));
        assert_ne!(a, view_fingerprint("1.2.3.4", "curl/8.0", 7));
        assert_ne!(a, view_fingerprint("1.2.3.4", "Mozilla/5.0", 8));
    }

    async fn setup() -> (ViewService, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES ('v', 'v@example.com', 'h')",
        )
        .execute(pool.as_sqlite().unwrap())
        .await
        .unwrap();

        let articles: Arc<dyn ArticleRepository> = Arc::new(SqlxArticleRepository::new(pool));
        let article = articles
            .create(&NewArticle {
                slug: "watched".to_string(),
                title: "Watched".to_string(),
                body: "Body".to_string(),
                author_id: 1,
                status: ArticleStatus::Published,
            })
            .await
            .unwrap();

        let cache = Arc::new(Cache::Memory(MemoryCache::new()));
        (ViewService::new(articles, cache), article.id)
    }

    #[tokio::test]
    async fn test_first_view_counts_repeats_do_not() {
        let (service, article_id) = setup().await;
        let client = ClientInfo::new("1.2.3.4", "Mozilla/5.0");

        let first = service.record_view(article_id, &client).await.unwrap();
        assert_eq!(
            first,
            ViewOutcome {
                counted: true,
                views: 1
            }
        );

        for _ in 0..3 {
            let repeat = service.record_view(article_id, &client).await.unwrap();
            assert_eq!(
                repeat,
                ViewOutcome {
                    counted: false,
                    views: 1
                }
            );
        }
    }

    #[tokio::test]
    async fn test_distinct_fingerprints_count_separately() {
        let (service, article_id) = setup().await;

        let first = service
            .record_view(article_id, &ClientInfo::new("1.2.3.4", "Mozilla/5.0"))
            .await
            .unwrap();
        assert_eq!(first.views, 1);

        let second = service
            .record_view(article_id, &ClientInfo::new("5.6.7.8", "Mozilla/5.0"))
            .await
            .unwrap();
        assert!(second.counted);
        assert_eq!(second.views, 2);
    }

    #[tokio::test]
    async fn test_expired_window_counts_again() {
        let (service, article_id) = setup().await;
        let service = ViewService::with_window(
            service.articles.clone(),
            service.cache.clone(),
            Duration::from_millis(20),
        );
        let client = ClientInfo::new("1.2.3.4", "Mozilla/5.0");

        let first = service.record_view(article_id, &client).await.unwrap();
        assert!(first.counted);

        tokio::time::sleep(Duration::from_millis(60)).await;

        let second = service.record_view(article_id, &client).await.unwrap();
        assert!(second.counted);
        assert_eq!(second.views, 2);
    }

    #[tokio::test]
    async fn test_missing_article_is_not_found() {
        let (service, _article_id) = setup().await;
        let client = ClientInfo::new("1.2.3.4", "Mozilla/5.0");

        let result = service.record_view(999_999, &client).await;
        assert!(matches!(result, Err(ViewServiceError::NotFound)));
    }
}
