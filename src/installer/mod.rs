//! Update checker and installer.
//!
//! One call to [`Installer::check_and_install`] runs a full update cycle:
//!
//! ```text
//! manifest ──▶ version differs? ──▶ archive (digest gate) ──▶ bundle (completeness gate) ──▶ persist
//! ```
//!
//! Every stage either reuses what is already on disk after verifying it, or
//! deletes it and acquires it again. Nothing is trusted on existence alone.

pub mod digest;
pub mod extract;
pub mod source;

pub use source::{HttpReleaseSource, ReleaseSource};

use crate::error::{Result, WardenError};
use crate::platform::{Bundle, ReleaseLayout};
use crate::version::{VersionInfo, VersionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Drives update cycles against one release source and work directory.
pub struct Installer {
    source: Arc<dyn ReleaseSource>,
    layout: ReleaseLayout,
    store: VersionStore,
}

impl Installer {
    /// Installer fetching from `source` into `layout`, recording versions in `store`.
    pub fn new(source: Arc<dyn ReleaseSource>, layout: ReleaseLayout, store: VersionStore) -> Self {
        Self {
            source,
            layout,
            store,
        }
    }

    /// Where archives and bundles are placed.
    pub fn layout(&self) -> &ReleaseLayout {
        &self.layout
    }

    /// Record of the installed version.
    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    /// Runs one update cycle. Never fails: on any error the problem is
    /// logged and the last known good version is returned.
    ///
    /// When `current` is empty the persisted version seeds the cycle, and
    /// that seeded value is what comes back if the cycle then fails.
    pub async fn check_and_install(&self, current: &VersionInfo) -> VersionInfo {
        let mut current = current.clone();

        if current.is_empty() {
            match self.store.load().await {
                Ok(Some(persisted)) => {
                    info!(version = %persisted.version, "Resuming from persisted version");
                    current = persisted;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(
                        "Failed to read version file {}: {}",
                        self.store.path().display(),
                        e
                    );
                    return current;
                }
            }
        }

        match self.try_install(&current).await {
            Ok(next) => next,
            Err(e) => {
                error!("Update check failed: {}", e);
                current
            }
        }
    }

    async fn try_install(&self, current: &VersionInfo) -> Result<VersionInfo> {
        let manifest = self.source.fetch_manifest().await?;
        let missing = manifest.missing_fields();
        if !missing.is_empty() {
            return Err(WardenError::IncompleteManifest {
                version: manifest.version,
                missing,
            });
        }

        if manifest.version == current.version {
            debug!(version = %current.version, "Already on latest version");
            return Ok(current.clone());
        }

        info!(
            from = %current.version,
            to = %manifest.version,
            "Found new version"
        );

        let archive = self.ensure_archive(&manifest).await?;
        let bundle = self.layout.bundle(&manifest.version);
        self.ensure_bundle(&archive, &bundle).await?;

        self.store.save(&manifest).await?;
        info!(version = %manifest.version, "Version installed");
        Ok(manifest)
    }

    /// Archive on disk whose digest matches the manifest, downloading if needed.
    async fn ensure_archive(&self, manifest: &VersionInfo) -> Result<PathBuf> {
        let path = self.layout.archive_path(&manifest.version);

        if tokio::fs::try_exists(&path).await? {
            let actual = hash_file(&path).await?;
            if digest::digest_matches(&actual, &manifest.sha1) {
                debug!(archive = %path.display(), "Archive digest verified, skipping download");
                return Ok(path);
            }
            warn!(
                archive = %path.display(),
                expected = %manifest.sha1,
                actual = %actual,
                "Archive digest mismatch, removing stale archive"
            );
            tokio::fs::remove_file(&path).await?;
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(url = %manifest.url, archive = %path.display(), "Downloading archive");
        let bytes = self.source.download(&manifest.url, &path).await?;
        info!(archive = %path.display(), bytes, "Archive downloaded");

        let downloaded = path.clone();
        let expected = manifest.sha1.clone();
        tokio::task::spawn_blocking(move || digest::verify_file(&downloaded, &expected)).await??;

        Ok(path)
    }

    /// Complete bundle directory, re-extracting when anything is missing.
    async fn ensure_bundle(&self, archive: &Path, bundle: &Bundle) -> Result<()> {
        if bundle.is_complete() {
            debug!(bundle = %bundle.dir().display(), "Bundle complete, skipping extraction");
            return Ok(());
        }

        if tokio::fs::try_exists(bundle.dir()).await? {
            warn!(
                bundle = %bundle.dir().display(),
                missing = ?bundle.missing_entries(),
                "Bundle incomplete, removing"
            );
            tokio::fs::remove_dir_all(bundle.dir()).await?;
        }

        info!(archive = %archive.display(), "Extracting archive");
        let archive = archive.to_path_buf();
        let dest = self.layout.root().to_path_buf();
        tokio::task::spawn_blocking(move || extract::extract_tar_gz(&archive, &dest)).await??;

        let missing = bundle.missing_entries();
        if !missing.is_empty() {
            return Err(WardenError::IncompleteBundle {
                dir: bundle.dir().to_path_buf(),
                missing,
            });
        }

        for entry in bundle.required_entries() {
            make_executable(&entry).await?;
        }

        info!(bundle = %bundle.dir().display(), "Bundle extracted");
        Ok(())
    }
}

async fn hash_file(path: &Path) -> Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || digest::sha1_file(&path)).await?
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(EXECUTABLE_MODE);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
