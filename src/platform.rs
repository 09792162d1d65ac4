//! Platform detection and deterministic release naming.
//!
//! Archive, bundle and executable paths are all derived from
//! [`release_name`], so the installer and the supervisor can never disagree
//! about where a version lives.

use std::fmt;
use std::path::{Path, PathBuf};

const PRIMARY_BINARY: &str = "ipfs";
const MONITOR_BINARY: &str = "ipfs-monitor";
const INSTALL_SCRIPT: &str = "install";
const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Target platform, named the way release manifests name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    /// Appended to executables (`.exe` on Windows)
    pub exe_suffix: String,
    /// Appended to the install script (`.bat` on Windows)
    pub script_suffix: String,
}

impl Platform {
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };

        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };

        let (exe_suffix, script_suffix) = if cfg!(windows) {
            (".exe", ".bat")
        } else {
            ("", "")
        };

        Self {
            os: os.to_string(),
            arch: arch.to_string(),
            exe_suffix: exe_suffix.to_string(),
            script_suffix: script_suffix.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// `<product>-<os>-<arch>-<version>`, shared by archive and bundle names.
pub fn release_name(product: &str, platform: &Platform, version: &str) -> String {
    format!("{}-{}-{}-{}", product, platform.os, platform.arch, version)
}

/// Expands `{product}`, `{platform}` and `{arch}` in a manifest URL template.
pub fn manifest_url(template: &str, product: &str, platform: &Platform) -> String {
    template
        .replace("{product}", product)
        .replace("{platform}", &platform.os)
        .replace("{arch}", &platform.arch)
}

/// Where releases of one product live on disk.
#[derive(Debug, Clone)]
pub struct ReleaseLayout {
    root: PathBuf,
    product: String,
    platform: Platform,
}

impl ReleaseLayout {
    /// Layout rooted at the work directory.
    pub fn new(root: impl Into<PathBuf>, product: impl Into<String>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            product: product.into(),
            platform,
        }
    }

    /// Directory holding archives and extracted bundles.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Product prefix of every release name.
    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// `<root>/<release name>.tar.gz`
    pub fn archive_path(&self, version: &str) -> PathBuf {
        let name = release_name(&self.product, &self.platform, version);
        self.root.join(format!("{}{}", name, ARCHIVE_EXTENSION))
    }

    /// Bundle directory for `version`, which may not exist yet.
    pub fn bundle(&self, version: &str) -> Bundle {
        let name = release_name(&self.product, &self.platform, version);
        Bundle {
            dir: self.root.join(name),
            platform: self.platform.clone(),
        }
    }
}

/// Extracted, ready-to-run directory for one version.
#[derive(Debug, Clone)]
pub struct Bundle {
    dir: PathBuf,
    platform: Platform,
}

impl Bundle {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn primary(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}", PRIMARY_BINARY, self.platform.exe_suffix))
    }

    pub fn monitor(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}", MONITOR_BINARY, self.platform.exe_suffix))
    }

    pub fn install_script(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}", INSTALL_SCRIPT, self.platform.script_suffix))
    }

    pub fn required_entries(&self) -> [PathBuf; 3] {
        [self.primary(), self.monitor(), self.install_script()]
    }

    /// Required entries that are not present on disk.
    pub fn missing_entries(&self) -> Vec<String> {
        self.required_entries()
            .iter()
            .filter(|path| !path.is_file())
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    /// A bundle counts as complete only when all three entries exist.
    pub fn is_complete(&self) -> bool {
        self.dir.is_dir() && self.missing_entries().is_empty()
    }
}
