//! Request-scoped identity and client metadata
//!
//! The session layer itself (cookie issuance, token storage) lives in the
//! embedding application; the engine only consumes these read-only
//! projections of the current request.

use serde::{Deserialize, Serialize};

/// The authenticated caller, as resolved by the embedding application's
/// session layer. Operations that require an identity take
/// `Option<&SessionUser>` and reject `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User ID of the caller
    pub user_id: i64,
    /// Username of the caller
    pub username: String,
}

impl SessionUser {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Client request metadata, used only to build the view fingerprint.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    /// Client network identifier (typically the forwarded-for address)
    pub ip: String,
    /// Client agent string
    pub user_agent: String,
}

impl ClientInfo {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
        }
    }
}
