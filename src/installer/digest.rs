use crate::error::{Result, WardenError};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io;
use std::path::Path;

/// Hex-encoded SHA-1 of a whole file.
pub fn sha1_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hex digests are compared case-insensitively.
pub fn digest_matches(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected.trim())
}

/// Fails with [`WardenError::DigestMismatch`] unless the file hashes to `expected`.
pub fn verify_file(path: &Path, expected: &str) -> Result<()> {
    let actual = sha1_file(path)?;
    if digest_matches(&actual, expected) {
        Ok(())
    } else {
        Err(WardenError::DigestMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}
