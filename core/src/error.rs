//! Error types surfaced through the orchestrator's callbacks.

use crate::remote::RemoteError;
use thiserror::Error;

/// Request-local failures. None of these are fatal to the orchestrator;
/// the calling feature owns retry UX.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// Model assets failed to download or initialize. The model state moves
    /// to `Failed` and stays there until `initialize` is called again.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// The background worker is unreachable (not started, or its thread
    /// died). Pending operations fail with this.
    #[error("background worker unreachable: {0}")]
    Transport(String),

    /// On-device inference failed mid-generation. The loaded model stays
    /// `Ready`; only load failures invalidate it.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The remote inference service failed. The remote-invocation counter
    /// was already incremented at dispatch.
    #[error("remote inference failed: {0}")]
    RemoteService(#[from] RemoteError),

    /// Completed text held no parseable structured payload. Distinct from
    /// `Generation`: the generation itself succeeded. No automatic remote
    /// fallback is attempted.
    #[error("structured output parse failed: {0}")]
    StructuredParse(String),
}

impl OrchestratorError {
    /// Short category name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::ModelLoad(_) => "model_load",
            OrchestratorError::Transport(_) => "transport",
            OrchestratorError::Generation(_) => "generation",
            OrchestratorError::RemoteService(_) => "remote_service",
            OrchestratorError::StructuredParse(_) => "structured_parse",
        }
    }
}
