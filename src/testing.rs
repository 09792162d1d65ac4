//! Shared fixtures for unit tests.

use crate::error::{Result, WardenError};
use crate::installer::ReleaseSource;
use crate::platform::{Bundle, Platform};
use crate::version::VersionInfo;
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn test_platform() -> Platform {
    Platform {
        os: "linux".into(),
        arch: "amd64".into(),
        exe_suffix: String::new(),
        script_suffix: String::new(),
    }
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Gzip tar containing a `root/` directory entry followed by `files` under it.
pub fn archive_bytes(root: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    let mut dir = tar::Header::new_gnu();
    dir.set_entry_type(tar::EntryType::Directory);
    dir.set_mode(0o755);
    dir.set_size(0);
    builder
        .append_data(&mut dir, format!("{}/", root), std::io::empty())
        .unwrap();

    for (name, body) in files {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o644);
        header.set_size(body.len() as u64);
        builder
            .append_data(&mut header, format!("{}/{}", root, name), body.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// In-memory release server.
pub struct FakeSource {
    manifest: Mutex<VersionInfo>,
    archives: Mutex<HashMap<String, Vec<u8>>>,
    fail_manifest: AtomicBool,
    pub downloads: AtomicUsize,
    pub manifest_fetches: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            manifest: Mutex::new(VersionInfo::default()),
            archives: Mutex::new(HashMap::new()),
            fail_manifest: AtomicBool::new(false),
            downloads: AtomicUsize::new(0),
            manifest_fetches: AtomicUsize::new(0),
        }
    }

    pub fn publish(&self, manifest: VersionInfo, archive: Vec<u8>) {
        self.archives
            .lock()
            .unwrap()
            .insert(manifest.url.clone(), archive);
        *self.manifest.lock().unwrap() = manifest;
    }

    pub fn manifest(&self) -> VersionInfo {
        self.manifest.lock().unwrap().clone()
    }

    pub fn fail_manifest(&self, fail: bool) {
        self.fail_manifest.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReleaseSource for FakeSource {
    async fn fetch_manifest(&self) -> Result<VersionInfo> {
        self.manifest_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_manifest.load(Ordering::SeqCst) {
            return Err(WardenError::ManifestStatus {
                url: "fake://manifest".into(),
                status: 503,
            });
        }
        Ok(self.manifest())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let body = self
            .archives
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("no archive at {}", url))
            })?;
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}

/// Shell scripts standing in for the bundle binaries.
///
/// Every lifecycle event is appended to `journal` as `<event> <tag>`, so tests
/// can assert on ordering across processes.
#[cfg(unix)]
pub struct ScriptBundle<'a> {
    pub tag: &'a str,
    pub journal: &'a Path,
    /// Primary ignores SIGINT and has to be killed
    pub stubborn_primary: bool,
    /// `stats bw` keeps failing
    pub never_ready: bool,
}

#[cfg(unix)]
impl ScriptBundle<'_> {
    pub fn primary_script(&self) -> String {
        let journal = self.journal.display();
        let tag = self.tag;
        let daemon = if self.stubborn_primary {
            format!("echo \"start primary {tag}\" >> {journal}\n    trap '' INT\n    exec sleep 30")
        } else {
            format!(
                "echo \"start primary {tag}\" >> {journal}\n    \
                 trap 'echo \"stop primary {tag}\" >> {journal}; exit 0' INT TERM\n    \
                 while :; do sleep 0.05; done"
            )
        };
        let stats = if self.never_ready { "exit 1" } else { "exit 0" };
        format!(
            "#!/bin/sh\ncase \"$1\" in\n  init)\n    echo \"init {tag}\" >> {journal}\n    ;;\n  \
             daemon)\n    {daemon}\n    ;;\n  stats)\n    {stats}\n    ;;\nesac\n"
        )
    }

    pub fn monitor_script(&self) -> String {
        let journal = self.journal.display();
        let tag = self.tag;
        format!(
            "#!/bin/sh\necho \"start monitor {tag}\" >> {journal}\n\
             trap 'echo \"stop monitor {tag}\" >> {journal}; exit 0' INT TERM\n\
             while :; do sleep 0.05; done\n"
        )
    }

    pub fn install_script(&self) -> String {
        format!(
            "#!/bin/sh\necho \"install {}\" >> {}\n",
            self.tag,
            self.journal.display()
        )
    }

    /// Archive entries for `root/`.
    pub fn archive(&self, root: &str) -> Vec<u8> {
        let primary = self.primary_script();
        let monitor = self.monitor_script();
        let install = self.install_script();
        archive_bytes(
            root,
            &[
                ("ipfs", primary.as_str()),
                ("ipfs-monitor", monitor.as_str()),
                ("install", install.as_str()),
            ],
        )
    }

    /// Writes the scripts straight into an extracted bundle directory.
    pub fn write_to(&self, bundle: &Bundle) {
        use std::os::unix::fs::PermissionsExt;

        std::fs::create_dir_all(bundle.dir()).unwrap();
        for (path, body) in [
            (bundle.primary(), self.primary_script()),
            (bundle.monitor(), self.monitor_script()),
            (bundle.install_script(), self.install_script()),
        ] {
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }
}

pub fn journal_lines(journal: &Path) -> Vec<String> {
    std::fs::read_to_string(journal)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Polls the journal until `line` shows up.
pub async fn wait_for_line(journal: &Path, line: &str, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if journal_lines(journal).iter().any(|l| l == line) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
