//! Client for the hosted blob store. Accepts a file and a destination
//! key, returns the public URL the store assigns.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart;
use serde::Deserialize;

pub struct BlobClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    public_url: String,
}

impl BlobClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build blob http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Uploads `bytes` under `destination_key` and returns the public
    /// URL. With `upsert` an existing object under the same key is
    /// replaced.
    pub async fn upload(&self, bytes: Vec<u8>, destination_key: &str, upsert: bool) -> Result<String> {
        let file_name = destination_key
            .rsplit('/')
            .next()
            .unwrap_or(destination_key)
            .to_string();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type_for(destination_key))
            .context("invalid upload content type")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/v1/objects/{destination_key}", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .multipart(form)
            .send()
            .await
            .context("blob upload request failed")?
            .error_for_status()
            .context("blob upload rejected")?
            .json::<UploadResponse>()
            .await
            .context("invalid blob upload response")?;
        Ok(response.public_url)
    }
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
