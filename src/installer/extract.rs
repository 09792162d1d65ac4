use crate::error::{Result, WardenError};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// Unpacks a `.tar.gz` under `dest`, keeping relative paths.
///
/// Directory entries are skipped; parent directories are created as files
/// are written. Symlinks and hard links are rejected, as are absolute or
/// `..` paths. Returns the number of files extracted.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<usize> {
    let tar_gz = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(tar_gz));
    let mut extracted = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        if kind.is_dir() {
            continue;
        }

        let relative = entry.path()?.into_owned();
        if kind.is_symlink() || kind.is_hard_link() {
            return Err(WardenError::UnsafeArchiveEntry(relative));
        }
        let target = dest.join(sanitize(&relative)?);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
        extracted += 1;
    }

    tracing::debug!(
        archive = %archive_path.display(),
        files = extracted,
        "Archive extracted"
    );
    Ok(extracted)
}

fn sanitize(path: &Path) -> Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(WardenError::UnsafeArchiveEntry(path.to_path_buf())),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(WardenError::UnsafeArchiveEntry(path.to_path_buf()));
    }
    Ok(clean)
}
