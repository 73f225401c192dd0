//! Committed sample storage.
//!
//! Committed samples live under `{output_dir}/{game}/{model_id}/` and only
//! ever get there by promoting a staged temp artifact. Promotion is a
//! single rename, so a sample is either fully committed or still staged,
//! never half-copied. Deletion is the one operation the user cannot take
//! back, so the store refuses it without an explicit confirmation flag.

use crate::error::{Result, VoxError};
use crate::session::StagedArtifact;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Audio file extension of committed samples.
const SAMPLE_EXT: &str = "wav";

/// One permanently stored sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedSample {
    /// Display name (file stem).
    pub name: String,
    /// Full path of the WAV file.
    pub path: PathBuf,
    /// Playback length in seconds, when the WAV header could be read.
    pub duration_secs: Option<f32>,
}

/// Promotes, lists, and deletes committed samples.
pub struct SampleStore {
    output_dir: PathBuf,
}

impl SampleStore {
    /// Create a store rooted at `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory holding one model's committed samples.
    #[must_use]
    pub fn model_dir(&self, game: &str, model_id: &str) -> PathBuf {
        self.output_dir.join(game).join(model_id)
    }

    /// Promote a staged artifact to its permanent location.
    ///
    /// The rename is atomic at the filesystem level. On failure the staged
    /// artifact is left untouched and the error is surfaced as
    /// [`VoxError::Destructive`]; that includes a temp file that vanished
    /// before the commit, and a target on a different filesystem than the
    /// staging directory.
    pub fn commit(&self, staged: &StagedArtifact) -> Result<CommittedSample> {
        if let Some(parent) = staged.target_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VoxError::Destructive(format!(
                    "cannot create sample directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        std::fs::rename(&staged.temp_path, &staged.target_path).map_err(|e| {
            VoxError::Destructive(format!(
                "cannot promote {} to {}: {e}",
                staged.temp_path.display(),
                staged.target_path.display()
            ))
        })?;

        info!(path = %staged.target_path.display(), "sample committed");
        Ok(sample_at(&staged.target_path))
    }

    /// List one model's committed samples, in directory order.
    ///
    /// A model that never had a commit has no directory and lists as
    /// empty; other read errors propagate.
    pub fn list(&self, game: &str, model_id: &str) -> Result<Vec<CommittedSample>> {
        let dir = self.model_dir(game, model_id);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut samples = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SAMPLE_EXT) {
                continue;
            }
            samples.push(sample_at(&path));
        }
        Ok(samples)
    }

    /// Delete a committed sample.
    ///
    /// The caller must pass `confirmed = true`; how confirmation is
    /// obtained (dialog, flag) is the boundary's concern, never inferred
    /// here. Any delete failure, including a file already gone, is
    /// surfaced as [`VoxError::Destructive`] so the UI re-lists instead of
    /// guessing.
    pub fn delete(&self, sample: &CommittedSample, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(VoxError::Unconfirmed);
        }

        std::fs::remove_file(&sample.path).map_err(|e| {
            VoxError::Destructive(format!("cannot delete sample {}: {e}", sample.path.display()))
        })?;
        info!(path = %sample.path.display(), "sample deleted");
        Ok(())
    }

    /// Drop an abandoned staged artifact's temp file. Already gone is fine;
    /// nothing the user confirmed lives at a temp path.
    pub fn discard(&self, staged: &StagedArtifact) -> Result<()> {
        match std::fs::remove_file(&staged.temp_path) {
            Ok(()) => {
                debug!(path = %staged.temp_path.display(), "staged artifact discarded");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VoxError::Destructive(format!(
                "cannot discard staged file {}: {e}",
                staged.temp_path.display()
            ))),
        }
    }
}

/// Build the display record for a WAV on disk.
fn sample_at(path: &Path) -> CommittedSample {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    CommittedSample {
        name,
        path: path.to_path_buf(),
        duration_secs: probe_duration_secs(path),
    }
}

/// WAV length in seconds, `None` when the header cannot be read. Duration
/// is cosmetic, so a truncated or foreign file never breaks the listing.
fn probe_duration_secs(path: &Path) -> Option<f32> {
    let reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f32 / spec.sample_rate as f32)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use tempfile::TempDir;

    fn write_test_wav(path: &Path, samples: u32, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..samples {
            writer.write_sample((i % 64) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn staged(dir: &TempDir, temp_name: &str, game: &str, model: &str, name: &str) -> StagedArtifact {
        StagedArtifact {
            temp_path: dir.path().join(temp_name),
            target_path: dir
                .path()
                .join(game)
                .join(model)
                .join(format!("{name}.wav")),
        }
    }

    #[test]
    fn commit_moves_temp_to_target() {
        let dir = TempDir::new().unwrap();
        let artifact = staged(&dir, "temp-1.wav", "alpha", "v1", "hello");
        write_test_wav(&artifact.temp_path, 22_050, 22_050);

        let store = SampleStore::new(dir.path());
        let sample = store.commit(&artifact).unwrap();

        assert!(!artifact.temp_path.exists());
        assert!(artifact.target_path.exists());
        assert_eq!(sample.name, "hello");
        assert_eq!(sample.path, artifact.target_path);
        let duration = sample.duration_secs.unwrap();
        assert!((duration - 1.0).abs() < 0.01, "got {duration}");
    }

    #[test]
    fn commit_missing_temp_is_destructive_error() {
        let dir = TempDir::new().unwrap();
        let artifact = staged(&dir, "temp-vanished.wav", "alpha", "v1", "hello");

        let store = SampleStore::new(dir.path());
        let err = store.commit(&artifact).unwrap_err();
        assert!(matches!(err, VoxError::Destructive(_)), "got {err:?}");
        assert!(!artifact.target_path.exists());
    }

    #[test]
    fn list_missing_model_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = SampleStore::new(dir.path());

        let samples = store.list("alpha", "v1").unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn list_returns_only_wav_files() {
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("alpha").join("v1");
        std::fs::create_dir_all(&model_dir).unwrap();
        write_test_wav(&model_dir.join("one.wav"), 1_000, 22_050);
        write_test_wav(&model_dir.join("two.wav"), 1_000, 22_050);
        std::fs::write(model_dir.join("notes.txt"), "not audio").unwrap();

        let store = SampleStore::new(dir.path());
        let mut names: Vec<String> = store
            .list("alpha", "v1")
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn list_survives_unreadable_wav_header() {
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("alpha").join("v1");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("broken.wav"), "definitely not RIFF").unwrap();

        let store = SampleStore::new(dir.path());
        let samples = store.list("alpha", "v1").unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "broken");
        assert_eq!(samples[0].duration_secs, None);
    }

    #[test]
    fn delete_requires_confirmation() {
        let dir = TempDir::new().unwrap();
        let artifact = staged(&dir, "temp-1.wav", "alpha", "v1", "keep me");
        write_test_wav(&artifact.temp_path, 1_000, 22_050);

        let store = SampleStore::new(dir.path());
        let sample = store.commit(&artifact).unwrap();

        let err = store.delete(&sample, false).unwrap_err();
        assert!(matches!(err, VoxError::Unconfirmed), "got {err:?}");
        assert!(sample.path.exists(), "unconfirmed delete must not touch the file");
    }

    #[test]
    fn confirmed_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let artifact = staged(&dir, "temp-1.wav", "alpha", "v1", "goodbye");
        write_test_wav(&artifact.temp_path, 1_000, 22_050);

        let store = SampleStore::new(dir.path());
        let sample = store.commit(&artifact).unwrap();

        store.delete(&sample, true).unwrap();
        assert!(!sample.path.exists());
    }

    #[test]
    fn delete_of_missing_file_is_destructive_error() {
        let dir = TempDir::new().unwrap();
        let store = SampleStore::new(dir.path());
        let sample = CommittedSample {
            name: "ghost".to_string(),
            path: dir.path().join("alpha").join("v1").join("ghost.wav"),
            duration_secs: None,
        };

        let err = store.delete(&sample, true).unwrap_err();
        assert!(matches!(err, VoxError::Destructive(_)), "got {err:?}");
    }

    #[test]
    fn discard_removes_temp_and_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        let artifact = staged(&dir, "temp-1.wav", "alpha", "v1", "draft");
        write_test_wav(&artifact.temp_path, 1_000, 22_050);

        let store = SampleStore::new(dir.path());
        store.discard(&artifact).unwrap();
        assert!(!artifact.temp_path.exists());

        // Discarding again is a no-op, not an error.
        store.discard(&artifact).unwrap();
    }

    #[test]
    fn model_dir_layout() {
        let store = SampleStore::new("/data/output");
        assert_eq!(
            store.model_dir("alpha", "v1"),
            PathBuf::from("/data/output/alpha/v1")
        );
    }
}
