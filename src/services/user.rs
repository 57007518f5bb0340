//! User service
//!
//! Registration, credential verification, and profile management.
//! Session token issuance is the embedding application's concern; this
//! service only yields the `SessionUser` identity on a successful
//! credential check.

use crate::db::repositories::{NewUser, UserRepository};
use crate::models::{RegisterInput, SessionUser, UpdateProfileInput, User, UserProfile};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Minimum password length accepted at registration
const PASSWORD_MIN: usize = 8;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]{3,50}$").expect("username regex is valid"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Referenced user does not exist
    #[error("User not found: {0}")]
    NotFound(String),

    /// Username already registered
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// Email already registered
    #[error("Email already registered")]
    EmailTaken,

    /// Wrong username/email or password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Dependency failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// User service
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Register a new user. The username is stored lowercase; the
    /// password is hashed with argon2 before it reaches the store.
    pub async fn register(&self, input: &RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_lowercase();
        let email = input.email.trim().to_lowercase();

        if !USERNAME_RE.is_match(&username) {
            return Err(UserServiceError::Validation(
                "Username must be 3-50 characters of a-z, 0-9, or underscore".to_string(),
            ));
        }
        if !email.contains('@') || !email.contains('.') {
            return Err(UserServiceError::Validation(
                "Invalid email address".to_string(),
            ));
        }
        if input.password.len() < PASSWORD_MIN {
            return Err(UserServiceError::Validation(format!(
                "Password must be at least {} characters",
                PASSWORD_MIN
            )));
        }

        if self
            .repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UsernameTaken(username));
        }
        if self
            .repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::EmailTaken);
        }

        let password_hash = hash_password(&input.password)?;

        let user = self
            .repo
            .create(&NewUser {
                username,
                email,
                password_hash,
            })
            .await
            .context("Failed to create user")?;

        Ok(user)
    }

    /// Verify a username-or-email plus password pair.
    ///
    /// Returns the caller identity on success; both unknown-user and
    /// wrong-password collapse into `InvalidCredentials`.
    pub async fn verify_credentials(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<SessionUser, UserServiceError> {
        let identifier = identifier.trim().to_lowercase();

        let user = if identifier.contains('@') {
            self.repo.get_by_email(&identifier).await
        } else {
            self.repo.get_by_username(&identifier).await
        }
        .context("Failed to look up user")?;

        let Some(user) = user else {
            return Err(UserServiceError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(UserServiceError::InvalidCredentials);
        }

        Ok(SessionUser::new(user.id, user.username))
    }

    /// Public profile for a username
    pub async fn profile(&self, username: &str) -> Result<UserProfile, UserServiceError> {
        let user = self
            .repo
            .get_by_username(&username.to_lowercase())
            .await
            .context("Failed to look up user")?
            .ok_or_else(|| UserServiceError::NotFound(username.to_string()))?;

        Ok(user.profile())
    }

    /// Update the caller's own profile fields
    pub async fn update_profile(
        &self,
        session: &SessionUser,
        input: &UpdateProfileInput,
    ) -> Result<UserProfile, UserServiceError> {
        let updated = self
            .repo
            .update_profile(session.user_id, input)
            .await
            .context("Failed to update profile")?
            .ok_or_else(|| UserServiceError::NotFound(session.username.clone()))?;

        Ok(updated.profile())
    }
}
