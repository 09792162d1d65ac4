use crate::clienv;
use crate::daemon::{CheckSchedule, RestartPolicy, SupervisorConfig};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_PRODUCT: &str = "iphash";
const DEFAULT_MANIFEST_URL: &str =
    "http://hash.iptokenmain.com/upgrade/{product}-{platform}-{arch}.json";
const DEFAULT_VERSION_FILE: &str = "upgrade.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WardenConfig {
    /// Product prefix used in archive and bundle names
    pub product: String,
    /// Directory holding archives, bundles and the version file
    pub work_dir: PathBuf,
    /// Manifest URL template ({product}, {platform}, {arch})
    pub manifest_url: String,
    /// Version file, relative to `work_dir` unless absolute
    pub version_file: PathBuf,
    /// Write logs here instead of stderr
    pub log_file: Option<PathBuf>,
    pub schedule: ScheduleSettings,
    pub supervisor: SupervisorSettings,
    pub restart: RestartSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleSettings {
    pub initial_delay_ms: u64,
    pub check_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupervisorSettings {
    pub stop_grace_ms: u64,
    pub kill_wait_ms: u64,
    pub settle_ms: u64,
    pub probe_interval_ms: u64,
    pub probe_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RestartSettings {
    pub delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
    pub max_attempts: Option<u32>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            work_dir: PathBuf::from("."),
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            version_file: PathBuf::from(DEFAULT_VERSION_FILE),
            log_file: None,
            schedule: ScheduleSettings::default(),
            supervisor: SupervisorSettings::default(),
            restart: RestartSettings::default(),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            check_interval_secs: 600,
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            stop_grace_ms: 3_000,
            kill_wait_ms: 5_000,
            settle_ms: 3_000,
            probe_interval_ms: 1_000,
            probe_attempts: 30,
        }
    }
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            max_delay_ms: 30_000,
            factor: 1.0,
            max_attempts: None,
        }
    }
}

impl WardenConfig {
    /// Loads `path` (or the default location), falling back to defaults when
    /// the file does not exist, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(clienv::config_path);
        let mut config = Self::from_file(&path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::trace!(path = %path.display(), "Loading config");

        if !path.exists() {
            tracing::trace!("Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Some(dir) = clienv::work_dir() {
            self.work_dir = dir;
        }
        if let Some(product) = clienv::product() {
            self.product = product;
        }
        if let Some(url) = clienv::manifest_url() {
            self.manifest_url = url;
        }
        if let Some(log_file) = clienv::log_file() {
            self.log_file = Some(log_file);
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.product.trim().is_empty(), "product must not be empty");
        ensure!(
            !self.manifest_url.trim().is_empty(),
            "manifest_url must not be empty"
        );
        ensure!(
            self.schedule.check_interval_secs > 0,
            "schedule.check_interval_secs must be positive"
        );
        ensure!(
            self.restart.factor.is_finite() && self.restart.factor >= 0.0,
            "restart.factor must be a non-negative number"
        );
        Ok(())
    }

    pub fn version_file_path(&self) -> PathBuf {
        self.work_dir.join(&self.version_file)
    }

    pub fn check_schedule(&self) -> CheckSchedule {
        CheckSchedule {
            initial_delay: Duration::from_millis(self.schedule.initial_delay_ms),
            interval: Duration::from_secs(self.schedule.check_interval_secs),
        }
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        let s = &self.supervisor;
        SupervisorConfig {
            stop_grace: Duration::from_millis(s.stop_grace_ms),
            kill_wait: Duration::from_millis(s.kill_wait_ms),
            settle_delay: Duration::from_millis(s.settle_ms),
            probe_interval: Duration::from_millis(s.probe_interval_ms),
            probe_attempts: s.probe_attempts,
            restart: RestartPolicy {
                first: Duration::from_millis(self.restart.delay_ms),
                max: Duration::from_millis(self.restart.max_delay_ms),
                factor: self.restart.factor,
                max_attempts: self.restart.max_attempts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = WardenConfig::from_file(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, WardenConfig::default());
        assert_eq!(config.supervisor_config().stop_grace, Duration::from_secs(3));
        assert_eq!(config.check_schedule(), CheckSchedule::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        fs::write(
            &path,
            r#"
product = "acme"
work_dir = "/srv/acme"

[supervisor]
stop_grace_ms = 500

[restart]
delay_ms = 250
factor = 2.0
max_attempts = 10
"#,
        )
        .unwrap();

        let config = WardenConfig::from_file(&path).unwrap();
        assert_eq!(config.product, "acme");
        assert_eq!(config.version_file_path(), PathBuf::from("/srv/acme/upgrade.json"));
        assert_eq!(config.schedule.check_interval_secs, 600);

        let sup = config.supervisor_config();
        assert_eq!(sup.stop_grace, Duration::from_millis(500));
        assert_eq!(sup.probe_attempts, 30);
        assert_eq!(sup.restart.first, Duration::from_millis(250));
        assert_eq!(sup.restart.max_attempts, Some(10));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        fs::write(&path, "product = [").unwrap();
        assert!(WardenConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = WardenConfig::default();
        config.schedule.check_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
