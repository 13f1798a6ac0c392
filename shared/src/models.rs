//! Domain models. The JSON shape exposed to clients is camelCase; the
//! snake_case persisted shape only exists inside the article store.

use serde::{Deserialize, Serialize};

/// A published article, fully normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Rich-text/HTML body.
    pub content: String,
    pub excerpt: String,
    /// Display name, not a user reference.
    pub author: String,
    /// Category id this article belongs to.
    pub category: String,
    /// Display fields copied from the category at write time. Not kept
    /// in sync with later category edits.
    pub category_name: String,
    pub category_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    /// `YYYY-MM-DD`.
    pub published_at: String,
    /// Display string, e.g. "5 min read".
    pub read_time: String,
    /// True when the body was sourced from a third party.
    pub is_aggregated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Order-preserving for display.
    pub tags: Vec<String>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Sparse article input for create and update. `None` means "not
/// supplied"; present-but-empty values are written through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub featured_image: Option<String>,
    pub published_at: Option<String>,
    pub read_time: Option<String>,
    pub is_aggregated: Option<bool>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_id: Option<String>,
}

/// A content category. Read-only from the article store's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Display color token, e.g. "#2563eb".
    pub color: String,
    pub description: String,
    pub user_id: String,
    pub created_at: String,
}

/// Recognized list filters. All supplied predicates combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArticleFilters {
    /// `"all"` or absent means no category restriction.
    pub category: Option<String>,
    /// Substring match over title, excerpt, author and serialized tags.
    pub search: Option<String>,
    pub is_aggregated: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
