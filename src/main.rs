//! Inkpost - storage and domain core for a markdown blogging platform
//!
//! Bootstrap entry: loads configuration, prepares the database, and
//! verifies the cache. The HTTP surface that embeds the engine runs
//! elsewhere; this binary exists so a deployment can initialize and
//! check its storage without one.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpost::{
    cache::{create_cache, CacheLayer},
    config::Config,
    db::{self, migrations},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpost=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Preparing Inkpost storage...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    let applied = migrations::run_migrations(&pool).await?;
    tracing::info!("Database schema up to date ({} migration(s) applied)", applied);

    pool.ping().await?;

    let cache = create_cache(&config.cache).await?;
    cache
        .set("startup:probe", &1u8, Duration::from_secs(5))
        .await?;
    let probe: Option<u8> = cache.get("startup:probe").await?;
    anyhow::ensure!(probe == Some(1), "cache round-trip failed");
    cache.delete("startup:probe").await?;
    tracing::info!("Cache verified: {:?}", config.cache.driver);

    tracing::info!(
        "Ready (feed page size {}, view window {}s)",
        config.engine.feed_page_size,
        config.engine.view_window_secs
    );

    pool.close().await;
    Ok(())
}
