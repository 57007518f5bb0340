//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for a specific entity.

pub mod article;
pub mod like;
pub mod tag;
pub mod user;

pub use article::{ArticleRepository, NewArticle, SqlxArticleRepository};
pub use like::{LikeOutcome, LikeRepository, SqlxLikeRepository, UnlikeOutcome};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{NewUser, SqlxUserRepository, UserRepository};
