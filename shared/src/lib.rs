//! Shared domain types and remote-service clients for Pressroom.
//!
//! The backend talks to three hosted collaborators: a document store
//! (articles and categories), an auth provider, and a blob store. All
//! article access funnels through [`articles::ArticleStore`], which owns
//! the normalization between the camelCase domain shape and the
//! snake_case persisted shape.

pub mod articles;
pub mod auth;
pub mod blob;
pub mod docstore;
pub mod models;

pub use articles::{validate_article_patch, validate_new_article, ArticleStore, ValidationError};
pub use models::{Article, ArticleFilters, ArticlePatch, Category};
