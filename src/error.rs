use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("manifest endpoint {url} returned status {status}")]
    ManifestStatus { url: String, status: u16 },

    #[error("manifest for version {version:?} is missing {missing:?}")]
    IncompleteManifest {
        version: String,
        missing: Vec<&'static str>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("digest mismatch for {}: expected {expected}, got {actual}", path.display())]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("bundle {} is incomplete, missing {missing:?}", dir.display())]
    IncompleteBundle { dir: PathBuf, missing: Vec<String> },

    #[error("archive entry escapes destination: {}", .0.display())]
    UnsafeArchiveEntry(PathBuf),

    #[error("primary process not ready after {attempts} probe attempts")]
    ReadinessTimeout { attempts: u32 },

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, WardenError>;
