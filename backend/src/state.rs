use std::sync::Arc;

use anyhow::Result;
use pressroom_shared::{
    articles::ArticleStore,
    auth::AuthClient,
    blob::BlobClient,
    docstore::{DocumentStore, RestDocumentStore},
};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    articles: Arc<ArticleStore>,
    auth: AuthClient,
    blobs: Arc<BlobClient>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> =
            Arc::new(RestDocumentStore::new(&config.docstore_url, &config.docstore_api_key)?);
        Ok(Self::with_store(
            store,
            AuthClient::new(&config.auth_url, &config.docstore_api_key)?,
            BlobClient::new(&config.blob_store_url, &config.docstore_api_key)?,
        ))
    }

    /// Assembles state around an explicit store implementation.
    pub fn with_store(store: Arc<dyn DocumentStore>, auth: AuthClient, blobs: BlobClient) -> Self {
        Self {
            articles: Arc::new(ArticleStore::new(store)),
            auth,
            blobs: Arc::new(blobs),
        }
    }

    pub fn articles(&self) -> &ArticleStore {
        &self.articles
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn blobs(&self) -> &BlobClient {
        &self.blobs
    }
}
