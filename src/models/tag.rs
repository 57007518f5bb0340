//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity.
///
/// Tags are created lazily the first time an article references them and
/// are shared across articles through the `article_tags` join table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Tag name (unique, lowercase alphanumeric)
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Tag with article count, for popular-tag listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    /// The tag itself
    #[serde(flatten)]
    pub tag: Tag,
    /// Number of published articles with this tag
    pub article_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_with_count_flattens() {
        let tag = Tag {
            id: 7,
            name: "rust".to_string(),
            created_at: Utc::now(),
        };
        let with_count = TagWithCount {
            tag,
            article_count: 42,
        };

        let json = serde_json::to_value(&with_count).unwrap();
        assert_eq!(json["name"], "rust");
        assert_eq!(json["article_count"], 42);
    }
}
