//! Error types for the synthesis workbench.

/// Top-level error type for the catalog and staging workflow.
#[derive(Debug, thiserror::Error)]
pub enum VoxError {
    /// Malformed or unreadable model descriptor.
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// Inference server request failure (transport or error status).
    #[error("server error: {0}")]
    Server(String),

    /// Text-to-sequence encoding error.
    #[error("encode error: {0}")]
    Encode(String),

    /// Synthesis requested for a model the server has not confirmed loaded.
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    /// Sample deletion attempted without explicit confirmation.
    #[error("refusing to delete a committed sample without confirmation")]
    Unconfirmed,

    /// Rename or delete failure that risks losing audio on disk.
    #[error("destructive file operation failed: {0}")]
    Destructive(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VoxError>;
