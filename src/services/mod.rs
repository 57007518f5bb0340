//! Services layer - business logic
//!
//! Services coordinate repositories and the cache, enforce business
//! rules, and translate store outcomes into typed errors. The HTTP layer
//! embedding this crate calls into these services directly.

pub mod article;
pub mod feed;
pub mod like;
pub mod password;
pub mod slug;
pub mod tag;
pub mod user;
pub mod view;

pub use article::{ArticleService, ArticleServiceError, MAX_ARTICLE_TAGS};
pub use feed::FeedAccumulator;
pub use like::{LikeService, LikeServiceError};
pub use password::{hash_password, verify_password};
pub use slug::{slugify, SlugAllocator};
pub use tag::{normalize_tag, TagService, TagServiceError};
pub use user::{UserService, UserServiceError};
pub use view::{view_fingerprint, ViewOutcome, ViewService, ViewServiceError};
