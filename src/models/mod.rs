//! Data models
//!
//! Database entities, input types, and request-scoped projections used
//! throughout the engine.

mod article;
mod session;
mod tag;
mod user;

pub use article::{
    Article, ArticleDetail, ArticleStatus, CreateArticleInput, FeedPage, FeedParams, TagFeedPage,
    UpdateArticleInput,
};
pub use session::{ClientInfo, SessionUser};
pub use tag::{Tag, TagWithCount};
pub use user::{RegisterInput, UpdateProfileInput, User, UserProfile};
