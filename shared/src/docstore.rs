//! Remote document store contract and implementations.
//!
//! The hosted store exposes a generic list/create/update/delete API per
//! collection with a declarative filter syntax: field equality,
//! `{field: {"contains": v}}` substring match, and `AND`/`OR`
//! composition. [`RestDocumentStore`] speaks that API over HTTP;
//! [`MemoryDocumentStore`] evaluates the same semantics in process and
//! backs tests and local development.

use std::{cmp::Ordering, collections::HashMap, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

/// A filter predicate over stored documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value.
    Eq(String, Value),
    /// Field contains the needle as a substring.
    Contains(String, String),
    /// All sub-clauses hold.
    And(Vec<Condition>),
    /// At least one sub-clause holds.
    Or(Vec<Condition>),
}

impl Condition {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Condition::Eq(field.to_string(), value.into())
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Condition::Contains(field.to_string(), needle.to_string())
    }

    /// Wire encoding consumed by the hosted store.
    pub fn to_value(&self) -> Value {
        match self {
            Condition::Eq(field, value) => {
                let mut clause = Map::new();
                clause.insert(field.clone(), value.clone());
                Value::Object(clause)
            },
            Condition::Contains(field, needle) => {
                let mut clause = Map::new();
                clause.insert(field.clone(), json!({ "contains": needle }));
                Value::Object(clause)
            },
            Condition::And(clauses) => {
                json!({ "AND": clauses.iter().map(Condition::to_value).collect::<Vec<_>>() })
            },
            Condition::Or(clauses) => {
                json!({ "OR": clauses.iter().map(Condition::to_value).collect::<Vec<_>>() })
            },
        }
    }

    /// Evaluates the predicate against one document. Substring matching
    /// is case insensitive, matching the hosted store's default
    /// collation.
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        match self {
            Condition::Eq(field, value) => record.get(field) == Some(value),
            Condition::Contains(field, needle) => {
                let haystack = match record.get(field) {
                    Some(Value::String(s)) => s.to_lowercase(),
                    Some(other) => other.to_string().to_lowercase(),
                    None => return false,
                };
                haystack.contains(&needle.to_lowercase())
            },
            Condition::And(clauses) => clauses.iter().all(|clause| clause.matches(record)),
            Condition::Or(clauses) => clauses.iter().any(|clause| clause.matches(record)),
        }
    }
}

/// Sort direction for `orderBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// A list request against one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Option<Condition>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(condition);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// The store contract the article service depends on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &str, query: ListQuery) -> Result<Vec<Value>>;
    async fn create(&self, collection: &str, record: Value) -> Result<Value>;
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// HTTP client for the hosted document API.
pub struct RestDocumentStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestDocumentStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build document store http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/v1/collections/{collection}", self.base_url)
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn list(&self, collection: &str, query: ListQuery) -> Result<Vec<Value>> {
        let mut body = Map::new();
        if let Some(filter) = &query.filter {
            body.insert("where".to_string(), filter.to_value());
        }
        if let Some((field, direction)) = &query.order_by {
            body.insert(
                "orderBy".to_string(),
                json!({ "field": field, "direction": direction.as_str() }),
            );
        }
        if let Some(limit) = query.limit {
            body.insert("limit".to_string(), limit.into());
        }
        if let Some(offset) = query.offset {
            body.insert("offset".to_string(), offset.into());
        }

        let rows = self
            .client
            .post(format!("{}/query", self.collection_url(collection)))
            .header("x-api-key", &self.api_key)
            .json(&Value::Object(body))
            .send()
            .await
            .context("document query request failed")?
            .error_for_status()
            .context("document query rejected")?
            .json::<Vec<Value>>()
            .await
            .context("invalid document query response")?;
        Ok(rows)
    }

    async fn create(&self, collection: &str, record: Value) -> Result<Value> {
        let created = self
            .client
            .post(self.collection_url(collection))
            .header("x-api-key", &self.api_key)
            .json(&record)
            .send()
            .await
            .context("document create request failed")?
            .error_for_status()
            .context("document create rejected")?
            .json::<Value>()
            .await
            .context("invalid document create response")?;
        Ok(created)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        self.client
            .patch(format!("{}/{id}", self.collection_url(collection)))
            .header("x-api-key", &self.api_key)
            .json(&patch)
            .send()
            .await
            .context("document update request failed")?
            .error_for_status()
            .context("document update rejected")?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.client
            .delete(format!("{}/{id}", self.collection_url(collection)))
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .context("document delete request failed")?
            .error_for_status()
            .context("document delete rejected")?;
        Ok(())
    }
}

/// In-process store with the same filter semantics as the hosted API.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a raw persisted-shape document, bypassing any client-side
    /// encoding. Useful for seeding legacy or malformed rows.
    pub async fn insert_raw(&self, collection: &str, record: Value) {
        if let Value::Object(map) = record {
            let mut collections = self.collections.write().await;
            collections.entry(collection.to_string()).or_default().push(map);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, collection: &str, query: ListQuery) -> Result<Vec<Value>> {
        let collections = self.collections.read().await;
        let mut rows: Vec<Map<String, Value>> = collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.as_ref().map_or(true, |f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(Value::Object)
            .collect())
    }

    async fn create(&self, collection: &str, record: Value) -> Result<Value> {
        let map = record
            .as_object()
            .cloned()
            .context("document must be a JSON object")?;
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(map.clone());
        Ok(Value::Object(map))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        let patch = patch
            .as_object()
            .cloned()
            .context("patch must be a JSON object")?;
        let mut collections = self.collections.write().await;
        if let Some(rows) = collections.get_mut(collection) {
            for row in rows.iter_mut() {
                if row.get("id").and_then(Value::as_str) == Some(id) {
                    for (key, value) in &patch {
                        row.insert(key.clone(), value.clone());
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(rows) = collections.get_mut(collection) {
            rows.retain(|row| row.get("id").and_then(Value::as_str) != Some(id));
        }
        Ok(())
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
