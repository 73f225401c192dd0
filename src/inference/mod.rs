//! HTTP boundary to the inference server.
//!
//! The synthesis server is a black box reached over local HTTP: one
//! endpoint swaps a model into memory, one renders a token sequence to a
//! WAV file on the shared filesystem. The payload structs here are the
//! wire contract; [`InferenceClient`] owns the HTTP client and timeout,
//! and [`coordinator::LoadCoordinator`] decides *when* a load request is
//! actually needed.
//!
//! # Status Model
//!
//! A readiness probe returns a [`ServerStatus`]:
//!
//! - [`Ready`](ServerStatus::Ready) — server answered the probe
//! - [`NotRunning`](ServerStatus::NotRunning) — connection refused / unreachable
//! - [`Timeout`](ServerStatus::Timeout) — no response within deadline
//! - [`Unhealthy`](ServerStatus::Unhealthy) — responds with an error status code
//! - [`TransportError`](ServerStatus::TransportError) — request failed mid-flight
//!
//! Probing is explicit (CLI and tests); no request path probes implicitly.

pub mod coordinator;

pub use coordinator::{LoadCoordinator, LoadDecision, ModelKey, RemoteModelState};

use crate::config::ServerConfig;
use crate::error::{Result, VoxError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

// ── Wire types ─────────────────────────────────────────────────

/// Body of `POST /loadModel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadModelRequest {
    /// Output channel count of the model.
    pub outputs: u32,
    /// Server-side path stem of the model weights.
    pub model: String,
    /// Pronunciation dictionary reference. Serialized as `null` when absent;
    /// the server distinguishes "no dictionary" from a missing field.
    pub cmudict: Option<String>,
}

/// Body of `POST /synthesize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Comma-joined integer token sequence.
    pub sequence: String,
    /// Path the server writes the rendered WAV to (shared filesystem).
    pub outfile: String,
}

/// Status of the inference server after probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    /// Server is running and answered the probe.
    Ready {
        /// Round-trip latency in milliseconds.
        latency_ms: u64,
    },
    /// Server is not running (connection refused / unreachable).
    NotRunning,
    /// Probe timed out waiting for a response.
    Timeout,
    /// Server responded with an HTTP error status.
    Unhealthy {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message from the response body.
        message: String,
    },
    /// The request failed after connecting.
    TransportError {
        /// Description of the failure.
        detail: String,
    },
}

impl ServerStatus {
    /// Returns `true` if the server answered the probe.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready { latency_ms } => write!(f, "Ready ({latency_ms}ms)"),
            Self::NotRunning => write!(f, "Not running (connection refused)"),
            Self::Timeout => write!(f, "Timeout (no response)"),
            Self::Unhealthy {
                status_code,
                message,
            } => write!(f, "Unhealthy (HTTP {status_code}): {message}"),
            Self::TransportError { detail } => write!(f, "Transport error: {detail}"),
        }
    }
}

// ── Client ─────────────────────────────────────────────────────

/// HTTP client for the inference server.
pub struct InferenceClient {
    /// Server connection settings.
    config: ServerConfig,
    /// Shared HTTP client.
    client: reqwest::Client,
}

impl InferenceClient {
    /// Create a client from server settings.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Returns a reference to the server settings.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Ask the server to swap the described model into memory.
    ///
    /// The response body is opaque; only the status code matters.
    ///
    /// # Errors
    ///
    /// Returns [`VoxError::Server`] on a transport failure or a non-2xx
    /// status.
    pub async fn load_model(&self, request: &LoadModelRequest) -> Result<()> {
        debug!(model = %request.model, outputs = request.outputs, "requesting model load");
        self.post_ok("loadModel", request).await
    }

    /// Submit a synthesis request. On success the server has written
    /// `request.outfile`.
    ///
    /// # Errors
    ///
    /// Returns [`VoxError::Server`] on a transport failure or a non-2xx
    /// status.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<()> {
        debug!(outfile = %request.outfile, "requesting synthesis");
        self.post_ok("synthesize", request).await
    }

    async fn post_ok<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.endpoint(path);
        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            VoxError::Server(format!("POST /{path}: {}", describe_reqwest_error(&e)))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(500).collect();
            return Err(VoxError::Server(format!(
                "POST /{path} returned HTTP {}: {message}",
                status.as_u16()
            )));
        }
        Ok(())
    }

    /// One readiness check: GET the server root, any 2xx counts as ready.
    pub async fn check_ready(&self) -> ServerStatus {
        let url = self.endpoint("");

        let start = std::time::Instant::now();
        match self.client.get(&url).send().await {
            Ok(resp) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                let status_code = resp.status().as_u16();

                if resp.status().is_success() {
                    ServerStatus::Ready { latency_ms }
                } else {
                    let body = resp.text().await.unwrap_or_default();
                    let message = if body.is_empty() {
                        format!("HTTP {status_code}")
                    } else {
                        body.chars().take(500).collect()
                    };
                    ServerStatus::Unhealthy {
                        status_code,
                        message,
                    }
                }
            }
            Err(e) => classify_reqwest_error(&e),
        }
    }

    /// Probe with bounded exponential backoff retry.
    ///
    /// Retries only on `NotRunning` and `Timeout`; `Unhealthy` and
    /// `TransportError` are returned immediately. The delay doubles per
    /// attempt and is capped at the request timeout.
    pub async fn probe_with_retry(&self) -> ServerStatus {
        let max_attempts = self.config.probe_retries.saturating_add(1);
        let mut last_status = ServerStatus::NotRunning;

        for attempt in 0..max_attempts {
            match self.check_ready().await {
                status @ ServerStatus::Ready { .. } => {
                    info!(attempt, "inference server ready");
                    return status;
                }
                status @ (ServerStatus::Unhealthy { .. } | ServerStatus::TransportError { .. }) => {
                    // Non-transient failure, return immediately.
                    return status;
                }
                status @ (ServerStatus::NotRunning | ServerStatus::Timeout) => {
                    last_status = status;
                    if attempt + 1 < max_attempts {
                        let shift = attempt.min(63);
                        let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
                        let delay_ms = self.config.probe_delay_ms.saturating_mul(multiplier);
                        let max_delay_ms = self.config.timeout_secs.saturating_mul(1000);
                        let capped_delay = delay_ms.min(max_delay_ms);
                        tokio::time::sleep(Duration::from_millis(capped_delay)).await;
                    }
                }
            }
        }

        last_status
    }
}

// ── Helpers ────────────────────────────────────────────────────

/// Classify a reqwest error into a ServerStatus.
fn classify_reqwest_error(err: &reqwest::Error) -> ServerStatus {
    if err.is_timeout() {
        ServerStatus::Timeout
    } else if err.is_connect() {
        ServerStatus::NotRunning
    } else {
        ServerStatus::TransportError {
            detail: err.to_string(),
        }
    }
}

/// Short human-readable description for request errors.
fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_owned()
    } else if err.is_connect() {
        "connection refused".to_owned()
    } else {
        err.to_string()
    }
}
