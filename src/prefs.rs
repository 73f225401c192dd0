//! User preference persistence.
//!
//! Remembers the game the user last worked in so the next launch can
//! reopen it. Persisted to `{config_dir}/prefs.json`.

use crate::error::{Result, VoxError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persistent workbench preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Identifier of the game selected when the app last ran.
    pub last_game: Option<String>,
}

impl Preferences {
    /// Load preferences from the default location. Returns the default
    /// state if the file is missing or cannot be parsed.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(&crate::app_dirs::prefs_file())
    }

    /// Load preferences from `path`, falling back to defaults on a missing
    /// or corrupt file. Preferences are a convenience, never a hard
    /// dependency, so load never fails.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(_) => return Self::default(),
        };

        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    /// Persist the current preferences to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&crate::app_dirs::prefs_file())
    }

    /// Persist the current preferences to `path`, creating parent
    /// directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VoxError::Config(format!(
                    "cannot create preferences directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| VoxError::Config(format!("cannot serialize preferences: {e}")))?;

        std::fs::write(path, json).map_err(|e| {
            VoxError::Config(format!("cannot write preferences to {}: {e}", path.display()))
        })?;

        Ok(())
    }

    /// Record a newly selected game.
    pub fn set_last_game(&mut self, game: impl Into<String>) {
        self.last_game = Some(game.into());
    }
}
