//! Configuration management
//!
//! Loads configuration for the Inkpost engine from:
//! - a config.yml file
//! - environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults, so an empty
//! or absent file yields a working single-instance setup (SQLite plus the
//! in-memory cache).

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Engine tuning knobs
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/inkpost.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache driver (memory or redis)
    #[serde(default)]
    pub driver: CacheDriver,
    /// Redis connection URL (optional)
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Default cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheDriver::default(),
            redis_url: None,
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

/// Cache driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    /// In-memory cache (default)
    #[default]
    Memory,
    /// Redis cache
    Redis,
}

/// Engine tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default number of articles per feed page
    #[serde(default = "default_feed_page_size")]
    pub feed_page_size: u32,
    /// View-dedup window in seconds (one counted view per fingerprint per window)
    #[serde(default = "default_view_window_secs")]
    pub view_window_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_page_size: default_feed_page_size(),
            view_window_secs: default_view_window_secs(),
        }
    }
}

fn default_feed_page_size() -> u32 {
    8
}

fn default_view_window_secs() -> u64 {
    60 * 60 * 24
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the default configuration; a file
    /// with invalid YAML is an error with the parse location attached.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides.
    ///
    /// Recognized variables:
    /// - INKPOST_DATABASE_DRIVER
    /// - INKPOST_DATABASE_URL
    /// - INKPOST_CACHE_DRIVER
    /// - INKPOST_CACHE_REDIS_URL
    /// - INKPOST_CACHE_TTL_SECONDS
    /// - INKPOST_FEED_PAGE_SIZE
    /// - INKPOST_VIEW_WINDOW_SECS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(driver) = std::env::var("INKPOST_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("INKPOST_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(driver) = std::env::var("INKPOST_CACHE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.cache.driver = CacheDriver::Memory,
                "redis" => self.cache.driver = CacheDriver::Redis,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(redis_url) = std::env::var("INKPOST_CACHE_REDIS_URL") {
            self.cache.redis_url = Some(redis_url);
        }
        if let Ok(ttl) = std::env::var("INKPOST_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(size) = std::env::var("INKPOST_FEED_PAGE_SIZE") {
            if let Ok(size) = size.parse::<u32>() {
                self.engine.feed_page_size = size;
            }
        }
        if let Ok(window) = std::env::var("INKPOST_VIEW_WINDOW_SECS") {
            if let Ok(window) = window.parse::<u64>() {
                self.engine.view_window_secs = window;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/inkpost.db");
        assert_eq!(config.cache.driver, CacheDriver::Memory);
        assert_eq!(config.engine.feed_page_size, 8);
        assert_eq!(config.engine.view_window_secs, 86_400);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.cache.ttl_seconds, 3600);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database:\n  driver: mysql\n  url: mysql://localhost/blog"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.database.url, "mysql://localhost/blog");
        // Unspecified sections fall back to defaults
        assert_eq!(config.cache.driver, CacheDriver::Memory);
        assert_eq!(config.engine.feed_page_size, 8);
    }

    #[test]
    fn test_load_invalid_yaml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "database: [not a mapping").unwrap();

        let result = Config::load(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = lock_env();

        std::env::set_var("INKPOST_DATABASE_URL", ":memory:");
        std::env::set_var("INKPOST_FEED_PAGE_SIZE", "16");
        std::env::set_var("INKPOST_VIEW_WINDOW_SECS", "3600");

        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_config.yml")).unwrap();

        std::env::remove_var("INKPOST_DATABASE_URL");
        std::env::remove_var("INKPOST_FEED_PAGE_SIZE");
        std::env::remove_var("INKPOST_VIEW_WINDOW_SECS");

        assert_eq!(config.database.url, ":memory:");
        assert_eq!(config.engine.feed_page_size, 16);
        assert_eq!(config.engine.view_window_secs, 3600);
    }

    #[test]
    fn test_env_override_invalid_driver_ignored() {
        let _guard = lock_env();

        std::env::set_var("INKPOST_DATABASE_DRIVER", "postgres");
        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_config.yml")).unwrap();
        std::env::remove_var("INKPOST_DATABASE_DRIVER");

        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
    }
}
