//! CLI configuration.
//!
//! Optional TOML file at `~/.config/sharecopy/config.toml` (or the path
//! given with `--config`). Every field has a default, so a partial file or
//! no file at all is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sharecopy_mirror::TransferPolicy;
use sharecopy_session::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transfer: TransferSection,

    #[serde(default)]
    pub reconnect: ReconnectSection,

    #[serde(default)]
    pub local_share: LocalShareSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSection {
    /// In-place attempts per chunk write.
    #[serde(default = "default_chunk_attempts")]
    pub chunk_attempts: u32,

    /// Whole-file attempts, each after a reconnect.
    #[serde(default = "default_file_attempts")]
    pub file_attempts: u32,

    /// Pause between files of one directory, in milliseconds.
    #[serde(default = "default_inter_file_delay_ms")]
    pub inter_file_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectSection {
    #[serde(default = "default_reconnect_attempts")]
    pub attempts: u32,

    /// Pause before each reconnect attempt, in seconds.
    #[serde(default = "default_reconnect_delay_secs")]
    pub delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalShareSection {
    /// Directory holding `<server>/<share>` mounts.
    #[serde(default = "default_mount_root")]
    pub mount_root: String,

    /// Largest write issued to the share, in bytes.
    #[serde(default = "default_max_write_size")]
    pub max_write_size: u32,
}

fn default_chunk_attempts() -> u32 {
    sharecopy_transfer::DEFAULT_CHUNK_ATTEMPTS
}

fn default_file_attempts() -> u32 {
    sharecopy_mirror::DEFAULT_FILE_ATTEMPTS
}

fn default_inter_file_delay_ms() -> u64 {
    sharecopy_mirror::DEFAULT_INTER_FILE_DELAY.as_millis() as u64
}

fn default_reconnect_attempts() -> u32 {
    sharecopy_session::DEFAULT_RECONNECT_ATTEMPTS
}

fn default_reconnect_delay_secs() -> u64 {
    sharecopy_session::DEFAULT_RECONNECT_DELAY.as_secs()
}

fn default_mount_root() -> String {
    "/mnt".into()
}

fn default_max_write_size() -> u32 {
    sharecopy_local_share::DEFAULT_MAX_WRITE_SIZE
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            chunk_attempts: default_chunk_attempts(),
            file_attempts: default_file_attempts(),
            inter_file_delay_ms: default_inter_file_delay_ms(),
        }
    }
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            attempts: default_reconnect_attempts(),
            delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl Default for LocalShareSection {
    fn default() -> Self {
        Self {
            mount_root: default_mount_root(),
            max_write_size: default_max_write_size(),
        }
    }
}

impl Config {
    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (config_path(), false),
        };

        if !required && !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn transfer_policy(&self) -> TransferPolicy {
        TransferPolicy {
            chunk_write: RetryPolicy::immediate(self.transfer.chunk_attempts),
            file_attempts: self.transfer.file_attempts,
            inter_file_delay: Duration::from_millis(self.transfer.inter_file_delay_ms),
        }
    }

    pub fn reconnect_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.reconnect.attempts,
            Duration::from_secs(self.reconnect.delay_secs),
        )
    }

    pub fn mount_root(&self) -> PathBuf {
        expand_home(&self.local_share.mount_root)
    }
}

/// Returns the default configuration file path.
fn config_path() -> PathBuf {
    home_dir()
        .join(".config")
        .join("sharecopy")
        .join("config.toml")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Expands a `~` prefix to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_constants() {
        let config = Config::default();
        assert_eq!(config.transfer_policy(), TransferPolicy::default());
        assert_eq!(config.reconnect_policy(), RetryPolicy::reconnect());
        assert_eq!(config.mount_root(), PathBuf::from("/mnt"));
        assert_eq!(config.local_share.max_write_size, 64 * 1024);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let toml_str = r#"
            [reconnect]
            attempts = 2

            [transfer]
            inter_file_delay_ms = 0
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.reconnect.attempts, 2);
        assert_eq!(config.reconnect.delay_secs, 20);
        assert_eq!(config.transfer.inter_file_delay_ms, 0);
        assert_eq!(config.transfer.file_attempts, 3);
        assert_eq!(config.local_share.mount_root, "/mnt");
    }

    #[test]
    fn load_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[local_share]\nmount_root = \"/srv/mounts\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.mount_root(), PathBuf::from("/srv/mounts"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&tmp.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[reconnect]\nattempts = \"many\"\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn expand_home_tilde() {
        assert_eq!(expand_home("/absolute"), PathBuf::from("/absolute"));
        let expanded = expand_home("~/mounts");
        assert!(expanded.to_string_lossy().ends_with("/mounts"));
        assert!(!expand_home("~").to_string_lossy().contains('~'));
    }
}
