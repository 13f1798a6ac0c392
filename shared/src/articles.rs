//! Article data service: the sole mediator between the HTTP surface and
//! the remote document store for articles and categories.
//!
//! The service owns two contracts. Filter composition: all supplied
//! list predicates combine with AND, and a search term expands to an OR
//! over title, excerpt, author and the serialized tags string.
//! Normalization: documents persist with snake_case fields, tags as a
//! JSON array string and the aggregation flag as `"1"`/`"0"`; the
//! domain shape is camelCase with native types, bridged here in both
//! directions.
//!
//! Every public method is fail-soft: remote failures are logged and
//! degrade to an empty list, `None` or `false` instead of propagating.
//! Callers must treat "no results" as ambiguous between a true empty
//! store and a read error.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{Map, Value};

use crate::{
    docstore::{Condition, Direction, DocumentStore, ListQuery},
    models::{Article, ArticleFilters, ArticlePatch, Category},
};

/// Applied when a list request carries no explicit limit.
pub const DEFAULT_LIST_LIMIT: usize = 20;

const DEFAULT_CATEGORY_COLOR: &str = "#2563eb";
const DEFAULT_READ_TIME: &str = "5 min read";

/// Rejected admin input, surfaced to the form before any write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("aggregated articles require sourceName and sourceUrl")]
    MissingAttribution,
}

/// Checks a creation payload: title, content and category are required,
/// and an aggregated article must carry its source attribution.
pub fn validate_new_article(input: &ArticlePatch) -> Result<(), ValidationError> {
    for (name, value) in [
        ("title", &input.title),
        ("content", &input.content),
        ("category", &input.category),
    ] {
        if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(ValidationError::MissingField(name));
        }
    }
    validate_article_patch(input)
}

/// Checks an update payload. Sparse updates may omit anything, but a
/// patch turning the aggregation flag on must supply the attribution.
pub fn validate_article_patch(input: &ArticlePatch) -> Result<(), ValidationError> {
    if input.is_aggregated == Some(true) {
        let present =
            |value: &Option<String>| value.as_deref().map(str::trim).is_some_and(|s| !s.is_empty());
        if !present(&input.source_name) || !present(&input.source_url) {
            return Err(ValidationError::MissingAttribution);
        }
    }
    Ok(())
}

/// Stateless service over the remote document store. Constructed once
/// at startup and shared by reference.
pub struct ArticleStore {
    store: Arc<dyn DocumentStore>,
    articles: String,
    categories: String,
}

impl ArticleStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            articles: "articles".to_string(),
            categories: "categories".to_string(),
        }
    }

    /// Lists articles matching the filters, most recent first. Returns
    /// an empty list on remote failure.
    pub async fn list(&self, filters: &ArticleFilters) -> Vec<Article> {
        match self.try_list(filters).await {
            Ok(articles) => articles,
            Err(err) => {
                tracing::warn!("failed to list articles: {err:#}");
                Vec::new()
            },
        }
    }

    /// Exact-match lookup. `None` covers both a missing article and a
    /// remote failure.
    pub async fn get_by_id(&self, id: &str) -> Option<Article> {
        match self.try_get_by_id(id).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("failed to fetch article {id}: {err:#}");
                None
            },
        }
    }

    /// The single most recently published article.
    pub async fn get_featured(&self) -> Option<Article> {
        match self.try_featured().await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("failed to fetch featured article: {err:#}");
                None
            },
        }
    }

    /// Recent articles excluding the most recent one, so the trending
    /// strip never duplicates the featured article. Empty when fewer
    /// than two articles are stored.
    pub async fn get_trending(&self, limit: usize) -> Vec<Article> {
        match self.try_trending(limit).await {
            Ok(articles) => articles,
            Err(err) => {
                tracing::warn!("failed to fetch trending articles: {err:#}");
                Vec::new()
            },
        }
    }

    /// Articles in the same category, excluding the given id, newest
    /// first.
    pub async fn get_related(&self, exclude_id: &str, category: &str, limit: usize) -> Vec<Article> {
        match self.try_related(exclude_id, category, limit).await {
            Ok(articles) => articles,
            Err(err) => {
                tracing::warn!("failed to fetch related articles: {err:#}");
                Vec::new()
            },
        }
    }

    /// All categories, name ascending.
    pub async fn get_categories(&self) -> Vec<Category> {
        match self.try_categories().await {
            Ok(categories) => categories,
            Err(err) => {
                tracing::warn!("failed to list categories: {err:#}");
                Vec::new()
            },
        }
    }

    /// Creates an article: generates the id, fills per-field defaults,
    /// encodes the persisted shape, stamps timestamps and returns the
    /// normalized round-trip of what was written. `None` on failure.
    pub async fn create(&self, input: &ArticlePatch) -> Option<Article> {
        match self.try_create(input).await {
            Ok(article) => Some(article),
            Err(err) => {
                tracing::warn!("failed to create article: {err:#}");
                None
            },
        }
    }

    /// Sparse update: only fields present in the patch are written;
    /// present-but-empty values write through. `updated_at` is always
    /// refreshed. Returns the re-read record, or `None` on failure.
    pub async fn update(&self, id: &str, patch: &ArticlePatch) -> Option<Article> {
        match self.try_update(id, patch).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("failed to update article {id}: {err:#}");
                None
            },
        }
    }

    /// Unconditional delete; does not verify prior existence.
    pub async fn delete(&self, id: &str) -> bool {
        match self.store.delete(&self.articles, id).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("failed to delete article {id}: {err:#}");
                false
            },
        }
    }

    async fn try_list(&self, filters: &ArticleFilters) -> Result<Vec<Article>> {
        let mut clauses = Vec::new();

        if let Some(category) = filters.category.as_deref() {
            if !category.is_empty() && category != "all" {
                clauses.push(Condition::eq("category", category));
            }
        }
        if let Some(search) = filters.search.as_deref() {
            let needle = search.trim();
            if !needle.is_empty() {
                clauses.push(Condition::Or(vec![
                    Condition::contains("title", needle),
                    Condition::contains("excerpt", needle),
                    Condition::contains("author", needle),
                    Condition::contains("tags", needle),
                ]));
            }
        }
        if let Some(flag) = filters.is_aggregated {
            clauses.push(Condition::eq("is_aggregated", encode_flag(flag)));
        }

        let mut query = ListQuery::new()
            .order_by("published_at", Direction::Desc)
            .limit(filters.limit.unwrap_or(DEFAULT_LIST_LIMIT));
        if let Some(filter) = compose_and(clauses) {
            query = query.filter(filter);
        }
        if let Some(offset) = filters.offset {
            query = query.offset(offset);
        }

        let rows = self.store.list(&self.articles, query).await?;
        Ok(decode_articles(&rows))
    }

    async fn try_get_by_id(&self, id: &str) -> Result<Option<Article>> {
        let query = ListQuery::new().filter(Condition::eq("id", id)).limit(1);
        let rows = self.store.list(&self.articles, query).await?;
        Ok(rows.first().and_then(Value::as_object).map(decode_article))
    }

    async fn try_featured(&self) -> Result<Option<Article>> {
        let query = ListQuery::new()
            .order_by("published_at", Direction::Desc)
            .limit(1);
        let rows = self.store.list(&self.articles, query).await?;
        Ok(rows.first().and_then(Value::as_object).map(decode_article))
    }

    async fn try_trending(&self, limit: usize) -> Result<Vec<Article>> {
        let query = ListQuery::new()
            .order_by("published_at", Direction::Desc)
            .limit(limit + 1);
        let rows = self.store.list(&self.articles, query).await?;
        Ok(rows
            .iter()
            .skip(1)
            .filter_map(Value::as_object)
            .map(decode_article)
            .take(limit)
            .collect())
    }

    async fn try_related(&self, exclude_id: &str, category: &str, limit: usize) -> Result<Vec<Article>> {
        // The filter syntax has no negation, so over-fetch by one and
        // drop the excluded id after the read.
        let query = ListQuery::new()
            .filter(Condition::eq("category", category))
            .order_by("published_at", Direction::Desc)
            .limit(limit + 1);
        let rows = self.store.list(&self.articles, query).await?;
        Ok(rows
            .iter()
            .filter_map(Value::as_object)
            .map(decode_article)
            .filter(|article| article.id != exclude_id)
            .take(limit)
            .collect())
    }

    async fn try_categories(&self) -> Result<Vec<Category>> {
        let query = ListQuery::new().order_by("name", Direction::Asc);
        let rows = self.store.list(&self.categories, query).await?;
        Ok(rows
            .iter()
            .filter_map(Value::as_object)
            .map(decode_category)
            .collect())
    }

    async fn try_create(&self, input: &ArticlePatch) -> Result<Article> {
        let now = Utc::now();
        let mut record = Map::new();
        record.insert("id".to_string(), generate_article_id().into());
        record.insert("title".to_string(), text_or_empty(&input.title));
        record.insert("content".to_string(), text_or_empty(&input.content));
        record.insert("excerpt".to_string(), text_or_empty(&input.excerpt));
        record.insert("author".to_string(), text_or_empty(&input.author));
        record.insert("category".to_string(), text_or_empty(&input.category));
        record.insert("category_name".to_string(), text_or_empty(&input.category_name));
        record.insert(
            "category_color".to_string(),
            input
                .category_color
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string())
                .into(),
        );
        record.insert("featured_image".to_string(), text_or_empty(&input.featured_image));
        record.insert(
            "published_at".to_string(),
            input
                .published_at
                .clone()
                .unwrap_or_else(|| now.format("%Y-%m-%d").to_string())
                .into(),
        );
        record.insert(
            "read_time".to_string(),
            input
                .read_time
                .clone()
                .unwrap_or_else(|| DEFAULT_READ_TIME.to_string())
                .into(),
        );
        record.insert(
            "is_aggregated".to_string(),
            encode_flag(input.is_aggregated.unwrap_or(false)).into(),
        );
        record.insert("source_name".to_string(), text_or_empty(&input.source_name));
        record.insert("source_url".to_string(), text_or_empty(&input.source_url));
        record.insert(
            "tags".to_string(),
            serialize_tags(input.tags.as_deref().unwrap_or(&[])).into(),
        );
        record.insert("user_id".to_string(), text_or_empty(&input.user_id));
        record.insert("created_at".to_string(), now.to_rfc3339().into());
        record.insert("updated_at".to_string(), now.to_rfc3339().into());

        let written = self
            .store
            .create(&self.articles, Value::Object(record.clone()))
            .await
            .context("article write failed")?;
        let row = written.as_object().cloned().unwrap_or(record);
        Ok(decode_article(&row))
    }

    async fn try_update(&self, id: &str, patch: &ArticlePatch) -> Result<Option<Article>> {
        let mut record = Map::new();
        insert_text(&mut record, "title", &patch.title);
        insert_text(&mut record, "content", &patch.content);
        insert_text(&mut record, "excerpt", &patch.excerpt);
        insert_text(&mut record, "author", &patch.author);
        insert_text(&mut record, "category", &patch.category);
        insert_text(&mut record, "category_name", &patch.category_name);
        insert_text(&mut record, "category_color", &patch.category_color);
        insert_text(&mut record, "featured_image", &patch.featured_image);
        insert_text(&mut record, "published_at", &patch.published_at);
        insert_text(&mut record, "read_time", &patch.read_time);
        if let Some(flag) = patch.is_aggregated {
            record.insert("is_aggregated".to_string(), encode_flag(flag).into());
        }
        insert_text(&mut record, "source_name", &patch.source_name);
        insert_text(&mut record, "source_url", &patch.source_url);
        if let Some(tags) = &patch.tags {
            record.insert("tags".to_string(), serialize_tags(tags).into());
        }
        insert_text(&mut record, "user_id", &patch.user_id);
        record.insert("updated_at".to_string(), Utc::now().to_rfc3339().into());

        self.store
            .update(&self.articles, id, Value::Object(record))
            .await
            .context("article update failed")?;
        self.try_get_by_id(id).await
    }
}

/// Caller-generated identifier: `article_<millis>_<random suffix>`.
fn generate_article_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("article_{}_{}", Utc::now().timestamp_millis(), suffix.to_lowercase())
}

fn compose_and(mut clauses: Vec<Condition>) -> Option<Condition> {
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(Condition::And(clauses)),
    }
}

/// The store types booleans as strings; the flag persists as "1"/"0".
fn encode_flag(flag: bool) -> &'static str {
    if flag {
        "1"
    } else {
        "0"
    }
}

/// Truthy numeric coercion: "1", 1 and true all decode to true.
fn decode_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Tags persist as a JSON array string.
pub fn serialize_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Malformed stored tag data degrades to an empty set rather than
/// failing.
pub fn parse_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn decode_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(raw)) => parse_tags(raw),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn text_or_empty(value: &Option<String>) -> Value {
    value.clone().unwrap_or_default().into()
}

fn insert_text(record: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        record.insert(key.to_string(), value.clone().into());
    }
}

/// Per-field lookup with a camelCase fallback, executed once at the
/// store boundary.
fn field<'a>(record: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    record
        .get(snake)
        .or_else(|| record.get(camel))
        .filter(|value| !value.is_null())
}

fn text(record: &Map<String, Value>, snake: &str, camel: &str) -> String {
    field(record, snake, camel)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_text(record: &Map<String, Value>, snake: &str, camel: &str) -> Option<String> {
    field(record, snake, camel)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn decode_articles(rows: &[Value]) -> Vec<Article> {
    rows.iter()
        .filter_map(Value::as_object)
        .map(decode_article)
        .collect()
}

fn decode_article(record: &Map<String, Value>) -> Article {
    Article {
        id: text(record, "id", "id"),
        title: text(record, "title", "title"),
        content: text(record, "content", "content"),
        excerpt: text(record, "excerpt", "excerpt"),
        author: text(record, "author", "author"),
        category: text(record, "category", "category"),
        category_name: text(record, "category_name", "categoryName"),
        category_color: text(record, "category_color", "categoryColor"),
        featured_image: opt_text(record, "featured_image", "featuredImage"),
        published_at: text(record, "published_at", "publishedAt"),
        read_time: text(record, "read_time", "readTime"),
        is_aggregated: decode_flag(field(record, "is_aggregated", "isAggregated")),
        source_name: opt_text(record, "source_name", "sourceName"),
        source_url: opt_text(record, "source_url", "sourceUrl"),
        tags: decode_tags(field(record, "tags", "tags")),
        user_id: text(record, "user_id", "userId"),
        created_at: text(record, "created_at", "createdAt"),
        updated_at: text(record, "updated_at", "updatedAt"),
    }
}

fn decode_category(record: &Map<String, Value>) -> Category {
    Category {
        id: text(record, "id", "id"),
        name: text(record, "name", "name"),
        color: text(record, "color", "color"),
        description: text(record, "description", "description"),
        user_id: text(record, "user_id", "userId"),
        created_at: text(record, "created_at", "createdAt"),
    }
}
