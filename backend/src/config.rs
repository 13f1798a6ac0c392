//! Environment-driven configuration with development defaults.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: String,
    pub docstore_url: String,
    pub docstore_api_key: String,
    pub auth_url: String,
    pub blob_store_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()),
            docstore_url: env::var("DOCSTORE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8090".to_string()),
            docstore_api_key: env::var("DOCSTORE_API_KEY").unwrap_or_default(),
            auth_url: env::var("AUTH_URL").unwrap_or_else(|_| "http://127.0.0.1:8091".to_string()),
            blob_store_url: env::var("BLOB_STORE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8092".to_string()),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
