//! One synthesis request/response cycle.
//!
//! The session owns the single staging slot: the freshly rendered audio
//! file the user is auditioning. Each render goes to a fresh
//! `temp-{uuid}.wav` (players cache audio by file name, so temp names are
//! never reused), and the previous unconfirmed render is deleted before
//! the next request goes out, so at most one staged file exists per
//! session.

use crate::error::{Result, VoxError};
use crate::inference::{InferenceClient, LoadCoordinator, SynthesisRequest};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Maximum characters of input text used to name a committed sample.
const TARGET_NAME_LIMIT: usize = 50;

/// Turns display text into the integer token sequence the server renders.
///
/// Text normalization and grapheme-to-phoneme conversion live outside this
/// crate; the session only needs something that produces tokens.
pub trait SequenceEncoder {
    /// Encode `text` into model input tokens.
    ///
    /// # Errors
    ///
    /// Implementations report unencodable input as [`VoxError::Encode`].
    fn encode(&self, text: &str) -> Result<Vec<i64>>;
}

/// A rendered sample awaiting the user's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    /// Where the server wrote the audio.
    pub temp_path: PathBuf,
    /// Where a commit will move it. Nothing exists there until then.
    pub target_path: PathBuf,
}

/// Drives synthesis round-trips and owns the staging slot.
pub struct SynthesisSession {
    output_dir: PathBuf,
    staged: Option<StagedArtifact>,
    busy: bool,
}

impl SynthesisSession {
    /// Create a session staging into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            staged: None,
            busy: false,
        }
    }

    /// The artifact currently staged, if any.
    #[must_use]
    pub fn staged(&self) -> Option<&StagedArtifact> {
        self.staged.as_ref()
    }

    /// Returns `true` while a synthesis request is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Empty the staging slot without touching the filesystem. Call after
    /// the staged file was promoted or discarded elsewhere.
    pub fn clear_staged(&mut self) {
        self.staged = None;
    }

    /// Render `text` with the selected model and stage the result.
    ///
    /// The selection must already be loaded according to `coordinator`;
    /// there is no implicit load here, so a failed or in-flight load can
    /// never silently synthesize with the wrong voice. On success the
    /// staging slot holds the new artifact; on failure the slot keeps its
    /// previous value and the busy flag is cleared either way.
    ///
    /// # Errors
    ///
    /// - [`VoxError::ModelNotLoaded`] when the gate fails
    /// - [`VoxError::Encode`] when the encoder rejects the text
    /// - [`VoxError::Destructive`] when the previous temp cannot be removed
    /// - [`VoxError::Server`] when the synthesis request fails
    pub async fn synthesize(
        &mut self,
        client: &InferenceClient,
        coordinator: &LoadCoordinator,
        encoder: &dyn SequenceEncoder,
        game: &str,
        model_id: &str,
        text: &str,
    ) -> Result<StagedArtifact> {
        if !coordinator.synthesis_allowed(game, model_id) {
            return Err(VoxError::ModelNotLoaded(format!("{game}/{model_id}")));
        }

        self.busy = true;
        let outcome = self.request_render(client, encoder, game, model_id, text).await;
        self.busy = false;

        let staged = outcome?;
        info!(game, model = model_id, temp = %staged.temp_path.display(), "sample staged");
        self.staged = Some(staged.clone());
        Ok(staged)
    }

    async fn request_render(
        &mut self,
        client: &InferenceClient,
        encoder: &dyn SequenceEncoder,
        game: &str,
        model_id: &str,
        text: &str,
    ) -> Result<StagedArtifact> {
        let tokens = encoder.encode(text)?;
        let sequence = tokens
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        // The previous unconfirmed render dies before its slot is reused.
        if let Some(previous) = &self.staged {
            remove_stale_temp(&previous.temp_path)?;
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let temp_path = self.output_dir.join(format!("temp-{}.wav", Uuid::new_v4()));
        let request = SynthesisRequest {
            sequence,
            outfile: temp_path.to_string_lossy().into_owned(),
        };
        client.synthesize(&request).await?;

        Ok(StagedArtifact {
            temp_path,
            target_path: self.target_path_for(game, model_id, text),
        })
    }

    /// Committed location for a render of `text`:
    /// `{output_dir}/{game}/{model_id}/{name}.wav`.
    fn target_path_for(&self, game: &str, model_id: &str, text: &str) -> PathBuf {
        self.output_dir
            .join(game)
            .join(model_id)
            .join(format!("{}.wav", sample_file_name(text)))
    }
}

/// First [`TARGET_NAME_LIMIT`] characters of `text`, with path separators
/// and NUL replaced so the name cannot escape the sample directory.
fn sample_file_name(text: &str) -> String {
    let name: String = text
        .chars()
        .take(TARGET_NAME_LIMIT)
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();

    let trimmed = name.trim();
    if trimmed.is_empty() {
        "sample".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Delete a leftover temp file. A file already gone is fine; any other
/// failure aborts the new request so two staged files never coexist.
fn remove_stale_temp(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale temp artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VoxError::Destructive(format!(
            "cannot remove stale temp file {}: {e}",
            path.display()
        ))),
    }
}
