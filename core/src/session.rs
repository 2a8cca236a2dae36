//! Streaming session - One in-flight generation's callback set.
//!
//! The session owns the single active callback triple and the correlation
//! ids that keep it safe: each `generate` bumps a monotonically increasing
//! request id, and worker events carrying any other id are discarded. The
//! guarantee is last-caller-wins: a newer `generate` supersedes an older
//! one, whose remaining events are dropped rather than misdelivered.

use crate::error::OrchestratorError;
use crate::protocol::WorkerCommand;
use crate::state::SharedState;
use log::{debug, warn};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// The callback triple for one generation.
///
/// `on_delta` fires synchronously on the event-pump thread for each chunk;
/// exactly one of `on_complete` / `on_error` follows.
#[derive(Clone)]
pub struct GenerationCallbacks {
    pub on_delta: Arc<dyn Fn(&str) + Send + Sync>,
    pub on_complete: Arc<dyn Fn(&str) + Send + Sync>,
    pub on_error: Arc<dyn Fn(OrchestratorError) + Send + Sync>,
}

impl GenerationCallbacks {
    pub fn new(
        on_delta: impl Fn(&str) + Send + Sync + 'static,
        on_complete: impl Fn(&str) + Send + Sync + 'static,
        on_error: impl Fn(OrchestratorError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_delta: Arc::new(on_delta),
            on_complete: Arc::new(on_complete),
            on_error: Arc::new(on_error),
        }
    }
}

/// The generation currently holding the callback slot.
pub(crate) struct ActiveGeneration {
    pub request_id: u64,
    pub callbacks: GenerationCallbacks,
}

/// Host-side handle for streaming generations through the worker.
#[derive(Clone)]
pub struct StreamingSession {
    shared: SharedState,
    command_tx: Sender<WorkerCommand>,
}

impl StreamingSession {
    pub(crate) fn new(shared: SharedState, command_tx: Sender<WorkerCommand>) -> Self {
        Self { shared, command_tx }
    }

    /// Submit one generation. Non-blocking: results arrive via `callbacks`.
    ///
    /// Any previously active generation is superseded; its remaining events
    /// are discarded by id.
    pub fn generate(&self, messages: Vec<crate::chat::ChatMessage>, callbacks: GenerationCallbacks) {
        let request_id = {
            let mut inner = self.shared.lock();
            inner.latest_request += 1;
            inner.generating = true;
            inner.active = Some(ActiveGeneration {
                request_id: inner.latest_request,
                callbacks: callbacks.clone(),
            });
            inner.latest_request
        };

        debug!("dispatching generation request_id={}", request_id);

        if self
            .command_tx
            .send(WorkerCommand::Generate { request_id, messages })
            .is_err()
        {
            let failed = {
                let mut inner = self.shared.lock();
                // Only unwind if nothing newer claimed the slot meanwhile.
                if inner.latest_request == request_id {
                    inner.generating = false;
                    inner.active.take()
                } else {
                    None
                }
            };
            if let Some(active) = failed {
                (active.callbacks.on_error)(OrchestratorError::Transport(
                    "worker channel closed".to_string(),
                ));
            }
        }
    }

    /// Clear the worker's conversational state. Does not interrupt an
    /// already-scheduled stream.
    pub fn reset_chat(&self) {
        if self.command_tx.send(WorkerCommand::Reset).is_err() {
            warn!("reset dropped: worker channel closed");
        }
    }

    pub fn is_generating(&self) -> bool {
        self.shared.is_generating()
    }
}

/// Deliver one `Delta` to the active callbacks, if it is still current.
pub(crate) fn apply_delta(shared: &SharedState, request_id: u64, text: &str) {
    let on_delta = {
        let inner = shared.lock();
        match inner.active {
            Some(ref active) if active.request_id == request_id => {
                Some(Arc::clone(&active.callbacks.on_delta))
            }
            _ => None,
        }
    };
    match on_delta {
        Some(on_delta) => on_delta(text),
        None => debug!("discarding stale delta for request_id={}", request_id),
    }
}

/// Deliver a terminal `Done`, releasing the callback slot.
pub(crate) fn apply_done(shared: &SharedState, request_id: u64, text: &str) {
    let finished = {
        let mut inner = shared.lock();
        match inner.active {
            Some(ref active) if active.request_id == request_id => {
                inner.generating = false;
                inner.active.take()
            }
            _ => None,
        }
    };
    match finished {
        Some(active) => (active.callbacks.on_complete)(text),
        None => debug!("discarding stale done for request_id={}", request_id),
    }
}

/// Deliver a terminal generation failure. The loaded model stays `Ready`;
/// only load failures demote it.
pub(crate) fn apply_generation_error(shared: &SharedState, request_id: u64, message: String) {
    let failed = {
        let mut inner = shared.lock();
        match inner.active {
            Some(ref active) if active.request_id == request_id => {
                inner.generating = false;
                inner.active.take()
            }
            _ => None,
        }
    };
    match failed {
        Some(active) => (active.callbacks.on_error)(OrchestratorError::Generation(message)),
        None => debug!("discarding stale error for request_id={}", request_id),
    }
}
