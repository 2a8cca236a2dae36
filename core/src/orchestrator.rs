//! Orchestrator facade - The composition root for adaptive inference.
//!
//! One explicit object, constructed with its collaborators injected (engine
//! factory, remote service, preference store) and handed to consuming
//! features, with no ambient globals. `start` brings up the worker and event
//! pump; `stop` tears them down. Everything in between is non-blocking and
//! resolves through callbacks.
//!
//! ## Runtime flow
//!
//! 1. A feature calls [`Orchestrator::generate_with_fallback`]
//! 2. The router picks local or remote
//! 3. Local: `Generate` goes over the channel, the worker streams deltas
//! 4. Remote: the HTTP call runs on a short-lived thread
//! 5. The callback triple resolves; telemetry records the outcome

use crate::chat::{ChatMessage, TaskKind};
use crate::config::OrchestratorConfig;
use crate::engine::EngineFactory;
use crate::error::OrchestratorError;
use crate::extract::SkillGroups;
use crate::lifecycle::{self, LifecycleController};
use crate::prefs::{InferenceMode, PreferenceStore, Preferences};
use crate::protocol::{WorkerCommand, WorkerEvent};
use crate::remote::RemoteService;
use crate::router::InferenceRouter;
use crate::session::{self, GenerationCallbacks, StreamingSession};
use crate::state::{InferenceSource, ModelState, SharedState};
use crate::telemetry::UsageTelemetry;
use crate::worker;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handles that exist only while the orchestrator is running.
struct Runtime {
    command_tx: Sender<WorkerCommand>,
    worker: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
    lifecycle: LifecycleController,
    session: StreamingSession,
    router: InferenceRouter,
}

/// Adaptive inference orchestrator.
///
/// Construct one per process at the composition root and inject it into
/// the features that need AI. Exactly one background worker serves the
/// on-device model for the lifetime of each `start`/`stop` span.
pub struct Orchestrator {
    config: OrchestratorConfig,
    prefs: Preferences,
    shared: SharedState,
    telemetry: UsageTelemetry,
    engine_factory: Arc<dyn EngineFactory>,
    remote: Arc<dyn RemoteService>,
    runtime: Option<Runtime>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        engine_factory: Arc<dyn EngineFactory>,
        remote: Arc<dyn RemoteService>,
        store: Box<dyn PreferenceStore>,
    ) -> Self {
        let prefs = Preferences::new(store);
        let shared = SharedState::new();
        let telemetry = UsageTelemetry::new(prefs.clone(), shared.clone());

        Self {
            config,
            prefs,
            shared,
            telemetry,
            engine_factory,
            remote,
            runtime: None,
        }
    }

    /// Bring up the background worker and event pump. Idempotent while
    /// running. If cached model assets were seen on a previous run and the
    /// user has not opted for remote-only, a delayed auto-initialize is
    /// scheduled.
    pub fn start(&mut self) {
        if self.runtime.is_some() {
            debug!("start ignored: orchestrator already running");
            return;
        }

        info!("starting inference orchestrator");

        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let worker = worker::spawn(Arc::clone(&self.engine_factory), command_rx, event_tx);
        let pump = spawn_event_pump(self.shared.clone(), self.prefs.clone(), event_rx);

        let lifecycle =
            LifecycleController::new(self.shared.clone(), command_tx.clone(), self.prefs.clone());
        let session = StreamingSession::new(self.shared.clone(), command_tx.clone());
        let router = InferenceRouter::new(
            session.clone(),
            Arc::clone(&self.remote),
            self.telemetry.clone(),
            self.prefs.clone(),
            self.shared.clone(),
        );

        if self.prefs.cached_model_present() && self.prefs.mode() != InferenceMode::PreferRemote {
            lifecycle.schedule_auto_init(
                Duration::from_millis(self.config.auto_init_delay_ms),
                self.config.model_id.clone(),
            );
        }

        self.runtime = Some(Runtime {
            command_tx,
            worker: Some(worker),
            pump: Some(pump),
            lifecycle,
            session,
            router,
        });
    }

    /// Tear down the worker and event pump. Safe to call when not running.
    pub fn stop(&mut self) {
        let Some(mut runtime) = self.runtime.take() else {
            return;
        };

        info!("stopping inference orchestrator");
        let _ = runtime.command_tx.send(WorkerCommand::Shutdown);
        if let Some(worker) = runtime.worker.take() {
            if worker.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        if let Some(pump) = runtime.pump.take() {
            if pump.join().is_err() {
                warn!("event pump panicked during shutdown");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    fn runtime(&self) -> Result<&Runtime, OrchestratorError> {
        self.runtime
            .as_ref()
            .ok_or_else(|| OrchestratorError::Transport("orchestrator not started".to_string()))
    }

    /// Begin loading the on-device model. `None` loads the configured
    /// default model.
    pub fn initialize_model(&self, model_id: Option<&str>) -> Result<(), OrchestratorError> {
        let runtime = self.runtime()?;
        runtime
            .lifecycle
            .initialize(model_id.unwrap_or(&self.config.model_id));
        Ok(())
    }

    /// Direct local generation. Requires a ready model; when it is not,
    /// the worker answers with an error through `on_error`. Callers that
    /// want transparent routing should use
    /// [`generate_with_fallback`](Self::generate_with_fallback).
    pub fn generate(
        &self,
        messages: Vec<ChatMessage>,
        callbacks: GenerationCallbacks,
    ) -> Result<(), OrchestratorError> {
        let runtime = self.runtime()?;
        runtime.session.generate(messages, callbacks);
        Ok(())
    }

    /// The primary entry point: route to the local model when it qualifies,
    /// the remote service otherwise. Returns where the request went.
    pub fn generate_with_fallback(
        &self,
        messages: Vec<ChatMessage>,
        task: TaskKind,
        callbacks: GenerationCallbacks,
    ) -> Result<InferenceSource, OrchestratorError> {
        let runtime = self.runtime()?;
        Ok(runtime.router.route(messages, task, callbacks))
    }

    /// Structured skill organization with the same routing rules.
    pub fn organize_with_fallback(
        &self,
        skills: Vec<String>,
        on_complete: impl Fn(SkillGroups) + Send + Sync + 'static,
        on_error: impl Fn(OrchestratorError) + Send + Sync + 'static,
    ) -> Result<InferenceSource, OrchestratorError> {
        let runtime = self.runtime()?;
        Ok(runtime
            .router
            .route_organize(skills, Arc::new(on_complete), Arc::new(on_error)))
    }

    /// Clear the background conversational state. Does not interrupt an
    /// already-scheduled stream.
    pub fn reset_chat(&self) -> Result<(), OrchestratorError> {
        let runtime = self.runtime()?;
        runtime.session.reset_chat();
        Ok(())
    }

    /// Persist the routing preference. `PreferRemote` also records a
    /// decline of local inference.
    pub fn set_preference_mode(&self, mode: InferenceMode) {
        self.prefs.set_mode(mode);
    }

    /// Opt back in to local inference and kick off a model load if the
    /// orchestrator is running.
    pub fn enable_local_inference(&self) {
        self.prefs.set_mode(InferenceMode::Auto);
        self.prefs.set_declined_local(false);
        if let Ok(runtime) = self.runtime() {
            runtime.lifecycle.initialize(&self.config.model_id);
        }
    }

    pub fn dismiss_nudge(&self) {
        self.telemetry.dismiss_nudge();
    }

    pub fn preference_mode(&self) -> InferenceMode {
        self.prefs.mode()
    }

    pub fn has_declined_local(&self) -> bool {
        self.prefs.declined_local()
    }

    pub fn should_suggest_local(&self) -> bool {
        self.telemetry.should_suggest_local()
    }

    pub fn should_offer_initial_setup(&self) -> bool {
        self.telemetry.should_offer_initial_setup()
    }

    pub fn model_state(&self) -> ModelState {
        self.shared.model_state()
    }

    pub fn is_generating(&self) -> bool {
        self.shared.is_generating()
    }

    pub fn last_source(&self) -> Option<InferenceSource> {
        self.telemetry.last_source()
    }

    pub fn remote_invocation_count(&self) -> u64 {
        self.telemetry.remote_invocation_count()
    }

    /// Register the model-state observer (fires on every transition,
    /// including download progress updates). Replaces any prior observer.
    pub fn on_progress(&self, observer: impl Fn(&ModelState) + Send + Sync + 'static) {
        self.shared.set_progress_observer(Arc::new(observer));
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drain worker events, update shared state, and invoke the active
/// callbacks. Runs until the worker drops its event sender.
fn spawn_event_pump(
    shared: SharedState,
    prefs: Preferences,
    event_rx: Receiver<WorkerEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(event) = event_rx.recv() {
            match event {
                WorkerEvent::Progress(progress) => lifecycle::apply_progress(&shared, progress),
                WorkerEvent::Ready => lifecycle::apply_ready(&shared, &prefs),
                WorkerEvent::Delta { request_id, text } => {
                    session::apply_delta(&shared, request_id, &text)
                }
                WorkerEvent::Done { request_id, text } => {
                    session::apply_done(&shared, request_id, &text)
                }
                WorkerEvent::Error {
                    request_id: Some(id),
                    message,
                } => session::apply_generation_error(&shared, id, message),
                WorkerEvent::Error {
                    request_id: None,
                    message,
                } => lifecycle::apply_load_error(&shared, message),
            }
        }
        debug!("event pump: channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferenceStore;
    use crate::testing::{EngineScript, MockRemote, ScriptedEngineFactory};

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            OrchestratorConfig::default(),
            Arc::new(ScriptedEngineFactory::new(EngineScript::default())),
            Arc::new(MockRemote::with_response("hi")),
            Box::new(MemoryPreferenceStore::new()),
        )
    }

    #[test]
    fn test_operations_require_start() {
        let orchestrator = orchestrator();
        assert!(!orchestrator.is_running());

        let err = orchestrator.initialize_model(None).unwrap_err();
        assert!(matches!(err, OrchestratorError::Transport(_)));

        let err = orchestrator
            .generate_with_fallback(
                vec![ChatMessage::user("hi")],
                TaskKind::General,
                GenerationCallbacks::new(|_| {}, |_| {}, |_| {}),
            )
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Transport(_)));
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let mut orchestrator = orchestrator();
        orchestrator.start();
        assert!(orchestrator.is_running());

        // Second start is a no-op, not a second worker.
        orchestrator.start();

        orchestrator.stop();
        assert!(!orchestrator.is_running());

        // Restart is allowed.
        orchestrator.start();
        assert!(orchestrator.is_running());
    }

    #[test]
    fn test_preference_operations_work_without_start() {
        let orchestrator = orchestrator();
        orchestrator.set_preference_mode(InferenceMode::PreferRemote);
        orchestrator.enable_local_inference();
        assert_eq!(orchestrator.model_state(), ModelState::Uninitialized);
    }
}
