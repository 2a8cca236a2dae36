//! Shared orchestrator state - The model state machine plus session flags.
//!
//! One `Arc<Mutex<_>>` cell shared by the host-facing handles and the event
//! pump. `generating` is an orthogonal flag, never a state value: the model
//! stays [`ModelState::Ready`] while a generation runs.

use crate::engine::LoadProgress;
use crate::session::ActiveGeneration;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle state of the on-device model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    /// No load has been requested yet.
    Uninitialized,
    /// Load in progress; carries the latest progress report.
    Downloading(LoadProgress),
    /// Loaded and able to serve generations.
    Ready,
    /// Load failed; a new `initialize` is required (no auto-retry).
    Failed(String),
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready)
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self, ModelState::Downloading(_))
    }

    /// Short name for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::Downloading(_) => "downloading",
            ModelState::Ready => "ready",
            ModelState::Failed(_) => "failed",
        }
    }
}

/// Where a request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceSource {
    Local,
    Remote,
}

impl InferenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceSource::Local => "local",
            InferenceSource::Remote => "remote",
        }
    }
}

/// Observer invoked on every model-state transition.
pub(crate) type ProgressObserver = Arc<dyn Fn(&ModelState) + Send + Sync>;

pub(crate) struct SharedInner {
    pub model_state: ModelState,
    pub generating: bool,
    /// Id handed to the most recent `Generate`; stale events are discarded.
    pub latest_request: u64,
    pub active: Option<ActiveGeneration>,
    pub last_source: Option<InferenceSource>,
    pub progress_observer: Option<ProgressObserver>,
}

/// Cloneable handle to the shared state cell.
#[derive(Clone)]
pub(crate) struct SharedState(Arc<Mutex<SharedInner>>);

impl SharedState {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(SharedInner {
            model_state: ModelState::Uninitialized,
            generating: false,
            latest_request: 0,
            active: None,
            last_source: None,
            progress_observer: None,
        })))
    }

    pub fn lock(&self) -> MutexGuard<'_, SharedInner> {
        // A poisoned mutex here means a callback panicked on the pump
        // thread; the state itself is still a plain value, so keep going.
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn model_state(&self) -> ModelState {
        self.lock().model_state.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.lock().generating
    }

    pub fn set_generating(&self, generating: bool) {
        self.lock().generating = generating;
    }

    pub fn last_source(&self) -> Option<InferenceSource> {
        self.lock().last_source
    }

    pub fn set_last_source(&self, source: InferenceSource) {
        self.lock().last_source = Some(source);
    }

    pub fn set_progress_observer(&self, observer: ProgressObserver) {
        self.lock().progress_observer = Some(observer);
    }

    /// Transition the model state and notify the observer outside the lock.
    pub fn transition(&self, next: ModelState) {
        let observer = {
            let mut inner = self.lock();
            inner.model_state = next.clone();
            inner.progress_observer.clone()
        };
        if let Some(observer) = observer {
            observer(&next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(ModelState::Ready.is_ready());
        assert!(!ModelState::Uninitialized.is_ready());
        assert!(ModelState::Downloading(LoadProgress::indeterminate("x")).is_downloading());
        assert!(!ModelState::Failed("boom".into()).is_downloading());
    }

    #[test]
    fn test_transition_notifies_observer() {
        let shared = SharedState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        shared.set_progress_observer(Arc::new(move |state: &ModelState| {
            sink.lock().unwrap().push(state.as_str());
        }));

        shared.transition(ModelState::Downloading(LoadProgress::new("dl", 0.5)));
        shared.transition(ModelState::Ready);

        assert_eq!(*seen.lock().unwrap(), vec!["downloading", "ready"]);
        assert!(shared.model_state().is_ready());
    }
}
