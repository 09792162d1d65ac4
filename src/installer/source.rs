use crate::error::{Result, WardenError};
use crate::version::VersionInfo;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Where manifests and release archives come from.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Latest release advertised for this platform.
    async fn fetch_manifest(&self) -> Result<VersionInfo>;

    /// Streams `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Manifest and archive access over HTTP.
pub struct HttpReleaseSource {
    client: reqwest::Client,
    manifest_url: String,
}

impl HttpReleaseSource {
    pub fn new(client: reqwest::Client, manifest_url: impl Into<String>) -> Self {
        Self {
            client,
            manifest_url: manifest_url.into(),
        }
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }
}

#[async_trait]
impl ReleaseSource for HttpReleaseSource {
    async fn fetch_manifest(&self) -> Result<VersionInfo> {
        tracing::debug!(url = %self.manifest_url, "Fetching release manifest");
        let response = self.client.get(&self.manifest_url).send().await?;

        if !response.status().is_success() {
            return Err(WardenError::ManifestStatus {
                url: self.manifest_url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}
