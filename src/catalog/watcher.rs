//! Catalog change detection.
//!
//! [`CatalogWatcher`] polls the model root and emits a
//! [`CatalogEvent::Changed`] when the directory tree changes, so the
//! catalog can be rebuilt while the app is running. Copying a model bundle
//! in touches many files in quick succession; a [`Debouncer`] collapses
//! each burst into a single signal and drops the rest.
//!
//! # Design
//!
//! The watcher runs as a background tokio task. It does not use OS-level
//! file notifications; it fingerprints the tree (path, mtime, size of every
//! entry) each tick and treats any fingerprint change as "something
//! happened". Polling a model tree once a second is cheap and behaves the
//! same on every platform. An unreadable root skips the tick: a broken
//! watcher only forfeits live reload, never an explicit rescan.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Signal that the model tree may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEvent {
    /// The model root fingerprint differs from the previous poll.
    Changed,
}

/// Single-slot debounce gate.
///
/// The first signal passes and arms the suppression window; every signal
/// inside the window is dropped, not deferred. Arrivals after the window
/// pass again.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_fire: Option<Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given suppression window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fire: None,
        }
    }

    /// Returns `true` and arms the window if the previous fire is outside
    /// it; returns `false` to drop the signal otherwise.
    pub fn try_fire(&mut self) -> bool {
        let now = Instant::now();
        match self.last_fire {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_fire = Some(now);
                true
            }
        }
    }
}

/// Polls the model root for tree changes and sends debounced
/// [`CatalogEvent::Changed`] signals.
pub struct CatalogWatcher {
    model_root: PathBuf,
    change_tx: mpsc::UnboundedSender<CatalogEvent>,
    cancel: CancellationToken,
    poll_interval: Duration,
    debounce: Debouncer,
}

impl CatalogWatcher {
    /// Create a watcher that signals changes via `change_tx`.
    ///
    /// Call [`run`](Self::run) to start polling.
    pub fn new(
        model_root: impl Into<PathBuf>,
        change_tx: mpsc::UnboundedSender<CatalogEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            model_root: model_root.into(),
            change_tx,
            cancel,
            poll_interval: Duration::from_secs(1),
            debounce: Debouncer::new(Duration::from_secs(1)),
        }
    }

    /// Override the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the debounce suppression window.
    #[must_use]
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce = Debouncer::new(window);
        self
    }

    /// Run the watcher loop until the cancellation token is cancelled.
    ///
    /// This method is `async` and is intended to be spawned as a background task:
    ///
    /// ```rust,ignore
    /// let watcher = CatalogWatcher::new(model_root, change_tx, cancel.child_token());
    /// tokio::spawn(watcher.run());
    /// ```
    pub async fn run(mut self) {
        let mut last = fingerprint_tree(&self.model_root);
        info!(root = %self.model_root.display(), "catalog watcher started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("catalog watcher cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    let Some(current) = fingerprint_tree(&self.model_root) else {
                        debug!(root = %self.model_root.display(), "model root unreadable, skipping poll");
                        continue;
                    };
                    if last != Some(current) {
                        // Track every change, even suppressed ones, so a
                        // quiet tree never re-fires for stale reasons.
                        last = Some(current);
                        if !self.debounce.try_fire() {
                            debug!("catalog change suppressed by debounce window");
                            continue;
                        }
                        if self.change_tx.send(CatalogEvent::Changed).is_err() {
                            warn!("catalog watcher: change_tx closed, stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Hash of every entry under `root`: relative path, mtime, and size.
///
/// Returns `None` when the root cannot be walked, so the caller can tell
/// "unreadable" apart from "empty tree". Entries are sorted before hashing
/// to keep the fingerprint independent of listing order.
fn fingerprint_tree(root: &Path) -> Option<u64> {
    let mut entries = Vec::new();
    collect_entries(root, root, &mut entries).ok()?;
    entries.sort();

    let mut hasher = DefaultHasher::new();
    for entry in &entries {
        entry.hash(&mut hasher);
    }
    Some(hasher.finish())
}

fn collect_entries(
    root: &Path,
    dir: &Path,
    out: &mut Vec<(PathBuf, u128, u64)>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        out.push((relative, mtime, metadata.len()));

        if metadata.is_dir() {
            collect_entries(root, &path, out)?;
        }
    }
    Ok(())
}
