//! Local engine seam - The opaque on-device model capability.
//!
//! The orchestrator never implements inference itself. It drives whatever
//! [`LocalEngine`] the embedding application injects: a llama.cpp wrapper, an
//! ONNX runtime session, or the scripted engine from [`crate::testing`].
//! Engines are constructed and loaded inside the background worker thread,
//! so implementations only need to be `Send`, never `Sync`.

use thiserror::Error;

/// Errors produced by a local engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Model assets failed to download or initialize.
    #[error("model load failed: {0}")]
    Load(String),

    /// On-device inference threw mid-generation.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A single load-progress report.
///
/// `fraction` is in `[0, 1]` when the engine can estimate it, `None` when
/// only a status message is available.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProgress {
    pub message: String,
    pub fraction: Option<f32>,
}

impl LoadProgress {
    pub fn new(message: impl Into<String>, fraction: f32) -> Self {
        Self {
            message: message.into(),
            fraction: Some(fraction.clamp(0.0, 1.0)),
        }
    }

    /// Progress with a status message but no usable fraction.
    pub fn indeterminate(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fraction: None,
        }
    }
}

/// On-device generation engine.
///
/// Owned exclusively by the worker thread after creation; all calls are
/// blocking from the worker's point of view and stream intermediate output
/// through the supplied sinks.
pub trait LocalEngine: Send {
    /// Download/initialize model assets, reporting progress as it goes.
    fn load(&mut self, on_progress: &mut dyn FnMut(LoadProgress)) -> Result<(), EngineError>;

    /// Run one generation, invoking `on_token` for each incremental chunk.
    /// Returns the full generated text.
    fn generate(
        &mut self,
        messages: &[crate::chat::ChatMessage],
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, EngineError>;

    /// Clear accumulated conversational state without unloading the model.
    fn reset(&mut self);
}

/// Factory for [`LocalEngine`] instances.
///
/// Invoked on the worker thread each time a model load is requested, so a
/// failed load can be retried with a fresh engine.
pub trait EngineFactory: Send + Sync {
    fn create(&self, model_id: &str) -> Result<Box<dyn LocalEngine>, EngineError>;
}
