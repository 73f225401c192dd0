//! Directory-backed model catalog.
//!
//! The catalog maps each *game* (an immediate subdirectory of the model
//! root) to its display asset and the model descriptor files found inside
//! it:
//!
//! ```text
//! {model_root}/{game}/{model}.json    one descriptor per model
//! {assets_dir}/{game}-*               display asset, matched by name prefix
//! ```
//!
//! Discovery is append-only: [`CatalogIndex::rebuild`] registers descriptor
//! files it has not seen before and never rescans a known one, so rebuilds
//! are cheap and repeat-safe while models are being copied in. Descriptor
//! *content* is read on activation only, via
//! [`CatalogIndex::descriptors_for`].

pub mod descriptor;
pub mod watcher;

pub use descriptor::{DESCRIPTOR_EXT, ModelDescriptor, read_descriptor};
pub use watcher::{CatalogEvent, CatalogWatcher, Debouncer};

use crate::error::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Key naming one descriptor file in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelRef {
    /// Game the descriptor belongs to.
    pub game: String,
    /// Descriptor file name within the game directory.
    pub file_name: String,
}

impl ModelRef {
    /// Full path of the descriptor file under `model_root`.
    #[must_use]
    pub fn path_under(&self, model_root: &Path) -> PathBuf {
        model_root.join(&self.game).join(&self.file_name)
    }
}

/// One game and the models discovered under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEntry {
    /// Identifier, taken from the directory name.
    pub id: String,
    /// Display asset file name, resolved once by prefix match when the game
    /// is first seen. `None` when nothing matches (accepted degraded state).
    pub asset: Option<String>,
    /// Models in discovery order.
    pub models: Vec<ModelRef>,
}

/// In-memory index of games and their models.
pub struct CatalogIndex {
    model_root: PathBuf,
    assets_dir: PathBuf,
    games: BTreeMap<String, GameEntry>,
    /// Every ref ever indexed, for dedup across rebuilds.
    indexed: HashSet<ModelRef>,
}

impl CatalogIndex {
    /// Create an empty index over `model_root`, with display assets
    /// resolved from `assets_dir`.
    pub fn new(model_root: impl Into<PathBuf>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_root: model_root.into(),
            assets_dir: assets_dir.into(),
            games: BTreeMap::new(),
            indexed: HashSet::new(),
        }
    }

    /// Root directory the index scans.
    #[must_use]
    pub fn model_root(&self) -> &Path {
        &self.model_root
    }

    /// Games in alphabetical order.
    pub fn games(&self) -> impl Iterator<Item = &GameEntry> {
        self.games.values()
    }

    /// Look up one game by identifier.
    #[must_use]
    pub fn game(&self, id: &str) -> Option<&GameEntry> {
        self.games.get(id)
    }

    /// Number of known games.
    #[must_use]
    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// Number of indexed models across all games.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.indexed.len()
    }

    /// Scan the model root and register every descriptor file not seen
    /// before. Returns the number of newly indexed models.
    ///
    /// A model root that does not exist yet indexes as empty; an unreadable
    /// game directory is skipped with a warning so one bad directory never
    /// hides the rest of the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the model root or assets directory exists but
    /// cannot be listed.
    pub fn rebuild(&mut self) -> Result<usize> {
        let entries = match std::fs::read_dir(&self.model_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(root = %self.model_root.display(), "model root missing, catalog empty");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };
        let assets = self.list_assets()?;

        let mut added = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(game) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Directory names with an extension marker are not games.
            if game.contains('.') {
                continue;
            }

            let files = match std::fs::read_dir(&path) {
                Ok(files) => files,
                Err(e) => {
                    tracing::warn!(game, error = %e, "cannot list game directory, skipping");
                    continue;
                }
            };

            for file in files.flatten() {
                let file_path = file.path();
                if file_path.extension().and_then(|ext| ext.to_str()) != Some(DESCRIPTOR_EXT) {
                    continue;
                }
                let Some(file_name) = file_path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };

                let model_ref = ModelRef {
                    game: game.to_string(),
                    file_name: file_name.to_string(),
                };
                if !self.indexed.insert(model_ref.clone()) {
                    continue;
                }

                self.games
                    .entry(game.to_string())
                    .or_insert_with(|| GameEntry {
                        id: game.to_string(),
                        asset: resolve_asset(&assets, game),
                        models: Vec::new(),
                    })
                    .models
                    .push(model_ref);
                added += 1;
            }
        }

        tracing::info!(
            added,
            games = self.games.len(),
            models = self.indexed.len(),
            "catalog rebuilt"
        );
        Ok(added)
    }

    /// Read the descriptors of one game's models, fresh from disk.
    ///
    /// A malformed or unreadable descriptor is skipped with a warning; the
    /// listing never aborts. An unknown game yields an empty list.
    #[must_use]
    pub fn descriptors_for(&self, game: &str) -> Vec<ModelDescriptor> {
        let Some(entry) = self.games.get(game) else {
            return Vec::new();
        };

        let mut descriptors = Vec::with_capacity(entry.models.len());
        for model_ref in &entry.models {
            let path = model_ref.path_under(&self.model_root);
            match read_descriptor(&path) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => {
                    tracing::warn!(game, file = %model_ref.file_name, error = %e, "skipping unreadable descriptor");
                }
            }
        }
        descriptors
    }

    /// File names in the assets directory. A directory that does not exist
    /// resolves every game to no asset.
    fn list_assets(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.assets_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
            .collect())
    }
}

/// First asset whose name starts with `{game}-`, in listing order.
///
/// The separator is part of the prefix so that `alpha` never claims
/// `alphabet-icon.png`.
fn resolve_asset(assets: &[String], game: &str) -> Option<String> {
    let prefix = format!("{game}-");
    assets.iter().find(|name| name.starts_with(&prefix)).cloned()
}
