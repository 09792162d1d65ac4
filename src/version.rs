use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Release metadata as served by the manifest endpoint and persisted locally.
///
/// `version` is opaque: it is compared by equality only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub url: String,
    pub sha1: String,
}

impl VersionInfo {
    pub fn is_empty(&self) -> bool {
        self.version.is_empty()
    }

    /// Names of the fields left blank; a usable manifest has none.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("version", &self.version),
            ("url", &self.url),
            ("sha1", &self.sha1),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// JSON file recording the currently installed release.
///
/// Only written after a bundle has been fully extracted.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<VersionInfo>> {
        if !tokio::fs::try_exists(&self.path).await? {
            tracing::trace!(path = %self.path.display(), "No persisted version file");
            return Ok(None);
        }

        let content = tokio::fs::read(&self.path).await?;
        let info: VersionInfo = serde_json::from_slice(&content)?;
        tracing::debug!(version = %info.version, "Loaded persisted version");
        Ok(Some(info))
    }

    pub async fn save(&self, info: &VersionInfo) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_vec_pretty(info)?;
        tokio::fs::write(&self.path, content).await?;
        tracing::debug!(version = %info.version, path = %self.path.display(), "Persisted version");
        Ok(())
    }
}
