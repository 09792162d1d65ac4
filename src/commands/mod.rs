pub(crate) mod check;
pub(crate) mod run;
pub(crate) mod status;

use std::sync::Arc;
use warden::installer::{HttpReleaseSource, Installer};
use warden::platform::{self, Platform, ReleaseLayout};
use warden::{VersionStore, WardenConfig};

/// Wires the HTTP release source, bundle layout and version file from config.
pub(crate) fn build_installer(config: &WardenConfig) -> anyhow::Result<Installer> {
    let platform = Platform::current();
    let manifest_url = platform::manifest_url(&config.manifest_url, &config.product, &platform);

    let client = reqwest::Client::builder()
        .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")))
        .build()?;

    tracing::debug!(
        manifest = %manifest_url,
        work_dir = %config.work_dir.display(),
        %platform,
        "Building installer"
    );

    Ok(Installer::new(
        Arc::new(HttpReleaseSource::new(client, manifest_url)),
        ReleaseLayout::new(&config.work_dir, &config.product, platform),
        VersionStore::new(config.version_file_path()),
    ))
}
