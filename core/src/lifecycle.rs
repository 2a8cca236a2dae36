//! Model lifecycle controller - Drives load/download over the channel.
//!
//! The controller turns `initialize` calls into `Init` commands and owns the
//! Uninitialized → Downloading → Ready/Failed state machine (mutated by the
//! event pump as the worker reports back). There is no auto-retry: a load
//! failure parks the state at `Failed` until `initialize` is called again.

use crate::engine::LoadProgress;
use crate::error::OrchestratorError;
use crate::prefs::{InferenceMode, Preferences};
use crate::protocol::WorkerCommand;
use crate::state::{ModelState, SharedState};
use log::{debug, info, warn};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

/// Host-side handle for model lifecycle operations.
#[derive(Clone)]
pub struct LifecycleController {
    shared: SharedState,
    command_tx: Sender<WorkerCommand>,
    prefs: Preferences,
}

impl LifecycleController {
    pub(crate) fn new(
        shared: SharedState,
        command_tx: Sender<WorkerCommand>,
        prefs: Preferences,
    ) -> Self {
        Self {
            shared,
            command_tx,
            prefs,
        }
    }

    /// Start loading the given model, unless a load is already in progress
    /// or the model is already ready.
    pub fn initialize(&self, model_id: &str) {
        {
            let inner = self.shared.lock();
            match inner.model_state {
                ModelState::Downloading(_) => {
                    debug!("initialize ignored: load already in progress");
                    return;
                }
                ModelState::Ready => {
                    debug!("initialize ignored: model already ready");
                    return;
                }
                _ => {}
            }
        }

        info!("initializing model {}", model_id);
        self.shared.transition(ModelState::Downloading(
            LoadProgress::indeterminate("requesting model load"),
        ));

        if self
            .command_tx
            .send(WorkerCommand::Init {
                model_id: model_id.to_string(),
            })
            .is_err()
        {
            warn!("init dropped: worker channel closed");
            self.shared
                .transition(ModelState::Failed("background worker unreachable".to_string()));
        }
    }

    pub fn state(&self) -> ModelState {
        self.shared.model_state()
    }

    /// Register the single state-transition observer, replacing any prior
    /// one. Invoked on the event-pump thread for every transition,
    /// including each `Downloading` progress update.
    pub fn on_progress(&self, observer: impl Fn(&ModelState) + Send + Sync + 'static) {
        self.shared.set_progress_observer(std::sync::Arc::new(observer));
    }

    /// Initialize after a short delay, giving the worker thread time to
    /// come alive. Used when cached model assets were seen on a previous
    /// run. The preference check is repeated after the delay in case the
    /// user switched to remote-only in the meantime.
    pub(crate) fn schedule_auto_init(&self, delay: Duration, model_id: String) {
        let controller = self.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            if controller.prefs.mode() == InferenceMode::PreferRemote {
                debug!("auto-init skipped: remote inference preferred");
                return;
            }
            if controller.state() != ModelState::Uninitialized {
                return;
            }
            info!("auto-initializing cached model {}", model_id);
            controller.initialize(&model_id);
        });
    }
}

/// Record a load-progress report from the worker.
pub(crate) fn apply_progress(shared: &SharedState, progress: LoadProgress) {
    shared.transition(ModelState::Downloading(progress));
}

/// The worker finished loading: mark ready and remember that assets are
/// cached so the next process start can auto-initialize.
pub(crate) fn apply_ready(shared: &SharedState, prefs: &Preferences) {
    info!("model ready");
    prefs.set_cached_model_present(true);
    shared.transition(ModelState::Ready);
}

/// A lifecycle failure from the worker: park at `Failed` and fail any
/// generation that was pending on the dead engine.
pub(crate) fn apply_load_error(shared: &SharedState, message: String) {
    warn!("model load failed: {}", message);

    let pending = {
        let mut inner = shared.lock();
        inner.generating = false;
        inner.active.take()
    };
    if let Some(active) = pending {
        (active.callbacks.on_error)(OrchestratorError::ModelLoad(message.clone()));
    }

    shared.transition(ModelState::Failed(message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferenceStore;
    use std::sync::mpsc;

    fn controller() -> (LifecycleController, mpsc::Receiver<WorkerCommand>, SharedState) {
        let shared = SharedState::new();
        let (tx, rx) = mpsc::channel();
        let prefs = Preferences::new(Box::new(MemoryPreferenceStore::new()));
        (
            LifecycleController::new(shared.clone(), tx, prefs),
            rx,
            shared,
        )
    }

    #[test]
    fn test_initialize_sends_init_and_enters_downloading() {
        let (controller, rx, shared) = controller();

        controller.initialize("test-model");

        assert!(shared.model_state().is_downloading());
        match rx.try_recv().unwrap() {
            WorkerCommand::Init { model_id } => assert_eq!(model_id, "test-model"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_initialize_is_noop_while_downloading_or_ready() {
        let (controller, rx, shared) = controller();

        controller.initialize("test-model");
        controller.initialize("test-model");
        assert_eq!(rx.try_iter().count(), 1);

        shared.transition(ModelState::Ready);
        controller.initialize("test-model");
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_initialize_allowed_again_after_failure() {
        let (controller, rx, shared) = controller();

        controller.initialize("test-model");
        apply_load_error(&shared, "disk full".to_string());
        assert!(matches!(shared.model_state(), ModelState::Failed(_)));

        controller.initialize("test-model");
        assert!(shared.model_state().is_downloading());
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_ready_persists_cached_flag() {
        let shared = SharedState::new();
        let prefs = Preferences::new(Box::new(MemoryPreferenceStore::new()));

        apply_ready(&shared, &prefs);

        assert!(shared.model_state().is_ready());
        assert!(prefs.cached_model_present());
    }
}
