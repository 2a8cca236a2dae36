//! Worker protocol - Typed messages between the host and the worker thread.
//!
//! The two enums below are the entire contract with the background execution
//! context: ordered, reliable delivery over `std::sync::mpsc`, no shared
//! memory. Every `Generate` carries a monotonically increasing `request_id`
//! which the worker echoes on `Delta`/`Done`/`Error`; the host discards
//! events whose id is not the latest, so a newer generation atomically
//! supersedes an older one. Lifecycle errors (load failures) carry
//! `request_id: None`.

use crate::chat::ChatMessage;
use crate::engine::LoadProgress;

/// Commands sent from the host to the worker thread.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Construct and load the engine for the given model.
    Init { model_id: String },

    /// Run one generation over the given messages.
    Generate {
        request_id: u64,
        messages: Vec<ChatMessage>,
    },

    /// Clear the engine's conversational state.
    Reset,

    /// Terminate the worker loop.
    Shutdown,
}

/// Events sent from the worker thread back to the host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Load progress report (zero or more while loading).
    Progress(LoadProgress),

    /// The engine finished loading and can serve generations.
    Ready,

    /// One incremental chunk of generated text.
    Delta { request_id: u64, text: String },

    /// Terminal event: the full generated text.
    Done { request_id: u64, text: String },

    /// Terminal failure. `request_id` is `Some` for a generation-local
    /// failure and `None` for a load/lifecycle failure.
    Error {
        request_id: Option<u64>,
        message: String,
    },
}
