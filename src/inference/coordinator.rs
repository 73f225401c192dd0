//! Remote model load coordination.
//!
//! The expensive step in the synthesis workflow is the server-side model
//! swap, not the synthesis call itself, so the coordinator tracks which
//! model the server currently holds and skips redundant `/loadModel`
//! round-trips. It is deliberately pure state: callers perform the HTTP
//! request and feed the outcome back via [`LoadCoordinator::resolve_load`],
//! and every resolution is validated against the pending selection so a
//! stale completion (the user switched models while a load was in flight)
//! can never corrupt the tracked state.

use super::{InferenceClient, LoadModelRequest};
use crate::catalog::ModelDescriptor;
use crate::error::Result;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Identity of one model as the server sees it.
///
/// Descriptor ids are only unique within a game, and the server loads
/// weights by `{game}/{id}` path, so both parts participate in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelKey {
    /// Game the model belongs to.
    pub game: String,
    /// Descriptor id of the model.
    pub id: String,
}

impl ModelKey {
    fn new(game: &str, id: &str) -> Self {
        Self {
            game: game.to_owned(),
            id: id.to_owned(),
        }
    }

    fn matches(&self, game: &str, id: &str) -> bool {
        self.game == game && self.id == id
    }
}

/// What the coordinator knows about the server's single model slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteModelState {
    /// Model the server confirmed as loaded, if any.
    pub loaded: Option<ModelKey>,
    /// Load awaiting resolution, if any. Synthesis is blocked while set.
    pub pending: Option<ModelKey>,
}

/// Outcome of a model selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDecision {
    /// The selection is already the active model; synthesis may proceed.
    AlreadyLoaded,
    /// The server must load the model first. Send this request, then report
    /// the outcome via [`LoadCoordinator::resolve_load`].
    LoadRequired(LoadModelRequest),
}

/// Tracks the server's loaded model and decides when loads are needed.
pub struct LoadCoordinator {
    model_root: PathBuf,
    state: RemoteModelState,
}

impl LoadCoordinator {
    /// Create a coordinator for models stored under `model_root`.
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            model_root: model_root.into(),
            state: RemoteModelState::default(),
        }
    }

    /// Current knowledge of the remote slot.
    #[must_use]
    pub fn state(&self) -> &RemoteModelState {
        &self.state
    }

    /// Returns `true` while a load awaits resolution.
    #[must_use]
    pub fn load_pending(&self) -> bool {
        self.state.pending.is_some()
    }

    /// The gate every synthesis request must pass: the selection is the
    /// confirmed loaded model and no load is in flight.
    #[must_use]
    pub fn synthesis_allowed(&self, game: &str, model_id: &str) -> bool {
        self.state.pending.is_none()
            && self
                .state
                .loaded
                .as_ref()
                .is_some_and(|key| key.matches(game, model_id))
    }

    /// Server-side path stem of a model's weights
    /// (`{model_root}/{game}/{id}`, no extension). The server owns the
    /// mapping from stem to weight files.
    #[must_use]
    pub fn model_path_for(&self, game: &str, model_id: &str) -> PathBuf {
        self.model_root.join(game).join(model_id)
    }

    /// Select a model for synthesis.
    ///
    /// Returns [`LoadDecision::AlreadyLoaded`] when the selection is the
    /// active model and nothing is pending. Otherwise marks the selection
    /// as awaiting load and returns the request to send; reselecting while
    /// pending reissues the request rather than assuming the in-flight one
    /// will land.
    pub fn select_model(&mut self, game: &str, descriptor: &ModelDescriptor) -> LoadDecision {
        if self.state.pending.is_none()
            && self
                .state
                .loaded
                .as_ref()
                .is_some_and(|key| key.matches(game, &descriptor.id))
        {
            debug!(game, model = %descriptor.id, "model already loaded, skipping load request");
            return LoadDecision::AlreadyLoaded;
        }

        let request = LoadModelRequest {
            outputs: descriptor.outputs,
            model: self
                .model_path_for(game, &descriptor.id)
                .to_string_lossy()
                .into_owned(),
            cmudict: descriptor.cmudict.clone(),
        };
        self.state.pending = Some(ModelKey::new(game, &descriptor.id));
        debug!(game, model = %descriptor.id, "model load required");
        LoadDecision::LoadRequired(request)
    }

    /// Report the outcome of a load request.
    ///
    /// A resolution that does not match the pending selection is stale
    /// (the user moved on while the request was in flight) and is discarded
    /// without touching state. Returns whether the resolution was applied.
    pub fn resolve_load(&mut self, game: &str, model_id: &str, success: bool) -> bool {
        match &self.state.pending {
            Some(pending) if pending.matches(game, model_id) => {}
            Some(pending) => {
                debug!(
                    game,
                    model = model_id,
                    pending_game = %pending.game,
                    pending_model = %pending.id,
                    "discarding stale load resolution"
                );
                return false;
            }
            None => {
                debug!(game, model = model_id, "discarding load resolution with nothing pending");
                return false;
            }
        }

        self.state.pending = None;
        if success {
            info!(game, model = model_id, "model loaded");
            self.state.loaded = Some(ModelKey::new(game, model_id));
        } else {
            // A failed swap may have evicted the previous model; claim nothing.
            warn!(game, model = model_id, "model load failed");
            self.state.loaded = None;
        }
        true
    }

    /// Drive one decide, request, resolve cycle against the server.
    ///
    /// # Errors
    ///
    /// Propagates the server error after recording the failed resolution.
    /// The coordinator ends up idle, so the next selection retries the
    /// full load.
    pub async fn ensure_loaded(
        &mut self,
        client: &InferenceClient,
        game: &str,
        descriptor: &ModelDescriptor,
    ) -> Result<()> {
        match self.select_model(game, descriptor) {
            LoadDecision::AlreadyLoaded => Ok(()),
            LoadDecision::LoadRequired(request) => {
                let outcome = client.load_model(&request).await;
                self.resolve_load(game, &descriptor.id, outcome.is_ok());
                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn descriptor(id: &str) -> ModelDescriptor {
        ModelDescriptor {
            id: id.to_string(),
            name: format!("Voice {id}"),
            outputs: 2,
            cmudict: None,
        }
    }

    #[test]
    fn first_selection_requires_load_with_full_payload() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        let mut desc = descriptor("v1");
        desc.cmudict = Some("en-v1".to_string());

        match coordinator.select_model("alpha", &desc) {
            LoadDecision::LoadRequired(request) => {
                assert_eq!(request.outputs, 2);
                assert_eq!(request.model, "/srv/models/alpha/v1");
                assert_eq!(request.cmudict.as_deref(), Some("en-v1"));
            }
            LoadDecision::AlreadyLoaded => panic!("fresh coordinator must require a load"),
        }
        assert!(coordinator.load_pending());
    }

    #[test]
    fn reselecting_loaded_model_skips_load() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        coordinator.select_model("alpha", &descriptor("v1"));
        assert!(coordinator.resolve_load("alpha", "v1", true));

        assert_eq!(
            coordinator.select_model("alpha", &descriptor("v1")),
            LoadDecision::AlreadyLoaded
        );
        assert!(coordinator.synthesis_allowed("alpha", "v1"));
    }

    #[test]
    fn selecting_different_model_requires_load() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        coordinator.select_model("alpha", &descriptor("v1"));
        coordinator.resolve_load("alpha", "v1", true);

        assert!(matches!(
            coordinator.select_model("alpha", &descriptor("v2")),
            LoadDecision::LoadRequired(_)
        ));
    }

    #[test]
    fn same_id_in_different_game_requires_load() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        coordinator.select_model("alpha", &descriptor("v1"));
        coordinator.resolve_load("alpha", "v1", true);

        // "v1" is a different model under a different game directory.
        match coordinator.select_model("beta", &descriptor("v1")) {
            LoadDecision::LoadRequired(request) => {
                assert_eq!(request.model, "/srv/models/beta/v1");
            }
            LoadDecision::AlreadyLoaded => panic!("id collision across games must reload"),
        }
    }

    #[test]
    fn synthesis_blocked_until_load_resolves() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        assert!(!coordinator.synthesis_allowed("alpha", "v1"));

        coordinator.select_model("alpha", &descriptor("v1"));
        assert!(!coordinator.synthesis_allowed("alpha", "v1"));

        coordinator.resolve_load("alpha", "v1", true);
        assert!(coordinator.synthesis_allowed("alpha", "v1"));
        assert!(!coordinator.synthesis_allowed("alpha", "v2"));
    }

    #[test]
    fn failed_load_leaves_coordinator_idle_and_unloaded() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        coordinator.select_model("alpha", &descriptor("v1"));
        assert!(coordinator.resolve_load("alpha", "v1", false));

        assert!(!coordinator.load_pending());
        assert!(!coordinator.synthesis_allowed("alpha", "v1"));
        // The next selection retries the full load.
        assert!(matches!(
            coordinator.select_model("alpha", &descriptor("v1")),
            LoadDecision::LoadRequired(_)
        ));
    }

    #[test]
    fn failed_load_also_clears_previously_loaded_model() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        coordinator.select_model("alpha", &descriptor("v1"));
        coordinator.resolve_load("alpha", "v1", true);

        coordinator.select_model("alpha", &descriptor("v2"));
        coordinator.resolve_load("alpha", "v2", false);

        // The failed swap may have evicted v1 server-side.
        assert!(!coordinator.synthesis_allowed("alpha", "v1"));
        assert_eq!(coordinator.state().loaded, None);
    }

    #[test]
    fn stale_resolution_is_discarded() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        coordinator.select_model("alpha", &descriptor("v1"));
        // User moved on before the v1 load landed.
        coordinator.select_model("alpha", &descriptor("v2"));

        assert!(!coordinator.resolve_load("alpha", "v1", true));
        assert_eq!(
            coordinator.state().pending,
            Some(ModelKey {
                game: "alpha".to_string(),
                id: "v2".to_string()
            })
        );
        assert!(!coordinator.synthesis_allowed("alpha", "v1"));
    }

    #[test]
    fn resolution_without_pending_is_discarded() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        assert!(!coordinator.resolve_load("alpha", "v1", true));
        assert_eq!(coordinator.state(), &RemoteModelState::default());
    }

    #[test]
    fn reselecting_while_pending_reissues_request() {
        let mut coordinator = LoadCoordinator::new("/srv/models");
        coordinator.select_model("alpha", &descriptor("v1"));

        assert!(matches!(
            coordinator.select_model("alpha", &descriptor("v1")),
            LoadDecision::LoadRequired(_)
        ));
    }

    #[test]
    fn model_path_joins_root_game_and_id() {
        let coordinator = LoadCoordinator::new("/srv/models");
        assert_eq!(
            coordinator.model_path_for("alpha", "v1"),
            PathBuf::from("/srv/models/alpha/v1")
        );
    }
}
