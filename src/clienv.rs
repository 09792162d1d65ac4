use std::path::PathBuf;

const ENV_CONFIG: &str = "WARDEN_CONFIG";
const ENV_WORK_DIR: &str = "WARDEN_WORK_DIR";
const ENV_PRODUCT: &str = "WARDEN_PRODUCT";
const ENV_MANIFEST_URL: &str = "WARDEN_MANIFEST_URL";
const ENV_LOG_FILE: &str = "WARDEN_LOG_FILE";

const FALLBACK_CONFIG_DIR: &str = "~/.config";
const WARDEN_SUBDIR: &str = "warden";
const CONFIG_FILE_NAME: &str = "warden.toml";

/// Non-empty value of an environment variable.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Config file path ($WARDEN_CONFIG or ~/.config/warden/warden.toml)
pub fn config_path() -> PathBuf {
    let path = env_opt(ENV_CONFIG).map(PathBuf::from).unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(FALLBACK_CONFIG_DIR))
            .join(WARDEN_SUBDIR)
            .join(CONFIG_FILE_NAME)
    });
    tracing::trace!(path = %path.display(), "Resolved config path");
    path
}

/// Work directory override ($WARDEN_WORK_DIR)
pub fn work_dir() -> Option<PathBuf> {
    let val = env_opt(ENV_WORK_DIR).map(PathBuf::from);
    tracing::trace!(value = ?val, "WARDEN_WORK_DIR env var");
    val
}

/// Product name override ($WARDEN_PRODUCT)
pub fn product() -> Option<String> {
    let val = env_opt(ENV_PRODUCT);
    tracing::trace!(value = ?val, "WARDEN_PRODUCT env var");
    val
}

/// Manifest URL template override ($WARDEN_MANIFEST_URL)
pub fn manifest_url() -> Option<String> {
    let val = env_opt(ENV_MANIFEST_URL);
    tracing::trace!(value = ?val, "WARDEN_MANIFEST_URL env var");
    val
}

/// Log file override ($WARDEN_LOG_FILE)
pub fn log_file() -> Option<PathBuf> {
    let val = env_opt(ENV_LOG_FILE).map(PathBuf::from);
    tracing::trace!(value = ?val, "WARDEN_LOG_FILE env var");
    val
}
