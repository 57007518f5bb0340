//! User repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{UpdateProfileInput, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Insert payload for a new user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user
    async fn create(&self, user: &NewUser) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update profile fields; unset fields are left unchanged.
    /// Returns the updated user, or `None` when it does not exist.
    async fn update_profile(&self, id: i64, input: &UpdateProfileInput) -> Result<Option<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_field_sqlite(self.pool.as_sqlite().unwrap(), "username", username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_field_mysql(self.pool.as_mysql().unwrap(), "username", username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_field_sqlite(self.pool.as_sqlite().unwrap(), "email", email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_field_mysql(self.pool.as_mysql().unwrap(), "email", email).await
            }
        }
    }

    async fn update_profile(&self, id: i64, input: &UpdateProfileInput) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_profile_sqlite(self.pool.as_sqlite().unwrap(), id, input).await
            }
            DatabaseDriver::Mysql => {
                update_profile_mysql(self.pool.as_mysql().unwrap(), id, input).await
            }
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, name, bio, avatar_url, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &NewUser) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        username: user.username.clone(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        name: None,
        bio: None,
        avatar_url: None,
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by id")?;

    Ok(row.map(|r| row_to_user_sqlite(&r)))
}

async fn get_user_by_field_sqlite(
    pool: &SqlitePool,
    field: &str,
    value: &str,
) -> Result<Option<User>> {
    // `field` is one of the fixed column names above, never caller input
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE {} = ?",
        USER_COLUMNS, field
    ))
    .bind(value)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Failed to get user by {}", field))?;

    Ok(row.map(|r| row_to_user_sqlite(&r)))
}

async fn update_profile_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &UpdateProfileInput,
) -> Result<Option<User>> {
    let existing = get_user_by_id_sqlite(pool, id).await?;
    let Some(existing) = existing else {
        return Ok(None);
    };

    let name = input.name.clone().or(existing.name);
    let bio = input.bio.clone().or(existing.bio);
    let avatar_url = input.avatar_url.clone().or(existing.avatar_url);
    let now = Utc::now();

    sqlx::query("UPDATE users SET name = ?, bio = ?, avatar_url = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(&bio)
        .bind(&avatar_url)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user profile")?;

    get_user_by_id_sqlite(pool, id).await
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &NewUser) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        username: user.username.clone(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        name: None,
        bio: None,
        avatar_url: None,
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by id")?;

    Ok(row.map(|r| row_to_user_mysql(&r)))
}

async fn get_user_by_field_mysql(
    pool: &MySqlPool,
    field: &str,
    value: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE {} = ?",
        USER_COLUMNS, field
    ))
    .bind(value)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Failed to get user by {}", field))?;

    Ok(row.map(|r| row_to_user_mysql(&r)))
}

async fn update_profile_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &UpdateProfileInput,
) -> Result<Option<User>> {
    let existing = get_user_by_id_mysql(pool, id).await?;
    let Some(existing) = existing else {
        return Ok(None);
    };

    let name = input.name.clone().or(existing.name);
    let bio = input.bio.clone().or(existing.bio);
    let avatar_url = input.avatar_url.clone().or(existing.avatar_url);
    let now = Utc::now();

    sqlx::query("UPDATE users SET name = ?, bio = ?, avatar_url = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(&bio)
        .bind(&avatar_url)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user profile")?;

    get_user_by_id_mysql(pool, id).await
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "$argon2id$hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup().await;

        let created = repo.create(&new_user("ada")).await.unwrap();
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "ada");

        let by_username = repo.get_by_username("ada").await.unwrap().unwrap();
        assert_eq!(by_username.id, created.id);

        let by_email = repo.get_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(repo.get_by_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let repo = setup().await;

        repo.create(&new_user("ada")).await.unwrap();

        let mut dup = new_user("ada");
        dup.email = "other@example.com".to_string();
        assert!(repo.create(&dup).await.is_err());
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let repo = setup().await;
        let created = repo.create(&new_user("ada")).await.unwrap();

        let updated = repo
            .update_profile(
                created.id,
                &UpdateProfileInput {
                    name: Some("Ada Lovelace".to_string()),
                    bio: Some("First programmer".to_string()),
                    avatar_url: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ada Lovelace"));

        // A later partial update keeps previously set fields
        let updated = repo
            .update_profile(
                created.id,
                &UpdateProfileInput {
                    name: None,
                    bio: None,
                    avatar_url: Some("https://img.example/a.png".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(updated.bio.as_deref(), Some("First programmer"));
        assert_eq!(updated.avatar_url.as_deref(), Some("https://img.example/a.png"));
    }

    #[tokio::test]
    async fn test_update_profile_missing_user() {
        let repo = setup().await;
        let result = repo
            .update_profile(999, &UpdateProfileInput::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
