use std::path::PathBuf;

use reqwest::{Method, StatusCode};

use crate::api::error;

/// Write-only mirror for save data. Keys look like `{user_id}/{data_id}`.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), error::SystemError>;
}

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), error::SystemError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}

pub struct WebDavConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub path: String,
}

pub struct WebDavBlobStore {
    client: reqwest::Client,
    config: WebDavConfig,
}

impl WebDavBlobStore {
    pub fn new(config: WebDavConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.path.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl BlobStore for WebDavBlobStore {
    fn name(&self) -> &'static str {
        "webdav"
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), error::SystemError> {
        if let Some((dir, _)) = key.rsplit_once('/') {
            let mkcol = Method::from_bytes(b"MKCOL")
                .map_err(|e| error::SystemError::internal(e.to_string()))?;
            let res = self
                .client
                .request(mkcol, self.url(&format!("{dir}/")))
                .basic_auth(&self.config.user, Some(&self.config.password))
                .send()
                .await?;

            // 405: collection exists
            if res.status() != StatusCode::METHOD_NOT_ALLOWED {
                res.error_for_status()?;
            }
        }

        self.client
            .put(self.url(key))
            .basic_auth(&self.config.user, Some(&self.config.password))
            .body(bytes.to_vec())
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
