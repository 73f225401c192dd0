//! Centralized application directory paths for voxlab.
//!
//! Provides a single source of truth for the filesystem paths the workbench
//! owns. Uses the [`dirs`] crate for platform-appropriate directory
//! resolution, which is sandbox-transparent on macOS (returns
//! container-relative paths under App Sandbox automatically).
//!
//! # Directory Layout
//!
//! | Purpose | macOS (sandbox) | Linux |
//! |---------|----------------|-------|
//! | App data | `~/Library/Application Support/voxlab/` | `~/.local/share/voxlab/` |
//! | Config | `~/Library/Application Support/voxlab/` | `~/.config/voxlab/` |
//!
//! # Environment Overrides
//!
//! All paths can be overridden for testing or custom deployments:
//! - `VOXLAB_DATA_DIR` — overrides [`data_dir`]
//! - `VOXLAB_CONFIG_DIR` — overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds durable workbench data that is not user-relocatable through
/// configuration.
///
/// Resolves to `dirs::data_dir()/voxlab/` by default. Override with
/// the `VOXLAB_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("VOXLAB_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("voxlab"))
        .unwrap_or_else(|| PathBuf::from("/tmp/voxlab-data"))
}

/// Application config directory.
///
/// Used for `config.toml` and `prefs.json`.
///
/// Resolves to `dirs::config_dir()/voxlab/` by default. Override with
/// the `VOXLAB_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("VOXLAB_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("voxlab"))
        .unwrap_or_else(|| PathBuf::from("/tmp/voxlab-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Preferences file path (`config_dir()/prefs.json`).
#[must_use]
pub fn prefs_file() -> PathBuf {
    config_dir().join("prefs.json")
}
