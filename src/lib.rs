//! voxlab: the catalog and staging core of a voice-synthesis workbench.
//!
//! The desktop shell around this crate stays thin; the engineering lives
//! in keeping three things consistent with each other: a directory-backed
//! model catalog, a remote inference server with a single model slot, and
//! an on-disk staging area for rendered audio.
//!
//! # Architecture
//!
//! - **Catalog**: append-only index of `{model_root}/{game}/*.json`
//!   descriptors, plus a polling watcher that collapses filesystem change
//!   bursts into single rebuild signals ([`catalog`])
//! - **Inference**: typed HTTP boundary to the server and a load
//!   coordinator that skips redundant model swaps and discards stale
//!   completions ([`inference`])
//! - **Session**: one synthesis round-trip, staging each render into a
//!   fresh `temp-{uuid}.wav` and deleting the previous unconfirmed one
//!   ([`session`])
//! - **Samples**: promotes staged audio into `{output}/{game}/{model}/`
//!   by atomic rename, lists it with WAV durations, and deletes it only
//!   with explicit confirmation ([`samples`])
//! - **Settings**: TOML config, last-game persistence, and platform
//!   directory resolution ([`config`], [`prefs`], [`app_dirs`])

pub mod app_dirs;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inference;
pub mod prefs;
pub mod samples;
pub mod session;

pub use catalog::{CatalogEvent, CatalogIndex, CatalogWatcher, GameEntry, ModelDescriptor, ModelRef};
pub use config::VoxConfig;
pub use error::{Result, VoxError};
pub use inference::{InferenceClient, LoadCoordinator, LoadDecision, ServerStatus};
pub use prefs::Preferences;
pub use samples::{CommittedSample, SampleStore};
pub use session::{SequenceEncoder, StagedArtifact, SynthesisSession};
