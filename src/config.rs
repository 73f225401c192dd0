//! Configuration types for the synthesis workbench.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the workbench.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxConfig {
    /// Catalog and output directory locations.
    pub paths: PathsConfig,
    /// Inference server connection settings.
    pub server: ServerConfig,
    /// Catalog watcher tuning.
    pub watcher: WatcherConfig,
}

/// Directory layout configuration.
///
/// Relative paths resolve against the working directory, matching a
/// workbench launched next to its model tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root directory scanned for game subdirectories and model descriptors.
    pub model_root: PathBuf,
    /// Directory of display assets, matched to games by file-name prefix.
    pub assets_dir: PathBuf,
    /// Root directory for staged temp audio and committed samples.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model_root: PathBuf::from("models"),
            assets_dir: PathBuf::from("assets"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Inference server connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the inference server.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Readiness probe retries on transient failures (0 = single attempt).
    pub probe_retries: u32,
    /// Initial delay between probe retries in milliseconds (doubles per retry).
    pub probe_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8008".to_string(),
            timeout_secs: 30,
            probe_retries: 3,
            probe_delay_ms: 500,
        }
    }
}

/// Catalog watcher tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Model root poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Change-signal suppression window in milliseconds.
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            debounce_ms: 1000,
        }
    }
}

impl VoxConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields. A missing file yields the default configuration, so
    /// a fresh install works without writing anything first.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|e| crate::error::VoxError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VoxError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path (`{config_dir}/config.toml`).
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = VoxConfig::default();
        assert!(!config.paths.model_root.as_os_str().is_empty());
        assert!(!config.paths.assets_dir.as_os_str().is_empty());
        assert!(!config.paths.output_dir.as_os_str().is_empty());
        assert!(config.server.base_url.starts_with("http"));
        assert!(config.server.timeout_secs > 0);
        assert!(config.watcher.poll_interval_ms > 0);
        assert!(config.watcher.debounce_ms > 0);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = VoxConfig::default();
        config.paths.model_root = PathBuf::from("/srv/voices/models");
        config.server.base_url = "http://127.0.0.1:9999".to_string();
        config.watcher.debounce_ms = 250;

        config.save_to_file(&path).unwrap();
        assert!(path.exists());

        let loaded = VoxConfig::from_file(&path).unwrap();
        assert_eq!(loaded.paths.model_root, PathBuf::from("/srv/voices/models"));
        assert_eq!(loaded.server.base_url, "http://127.0.0.1:9999");
        assert_eq!(loaded.watcher.debounce_ms, 250);
    }

    #[test]
    fn from_file_missing_returns_defaults() {
        let config = VoxConfig::from_file(std::path::Path::new("/nonexistent/path/config.toml"));
        let config = config.unwrap();
        assert_eq!(config.server.base_url, VoxConfig::default().server.base_url);
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let result = VoxConfig::from_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn partial_file_fills_missing_sections_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[server]\nbase_url = \"http://10.0.0.5:8008\"\n").unwrap();

        let config = VoxConfig::from_file(&path).unwrap();
        assert_eq!(config.server.base_url, "http://10.0.0.5:8008");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.paths.model_root, PathBuf::from("models"));
        assert_eq!(config.watcher.poll_interval_ms, 1000);
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = VoxConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("voxlab"));
    }

    #[test]
    fn config_serializes_to_toml() {
        let config = VoxConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("model_root"));
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("debounce_ms"));
    }
}
