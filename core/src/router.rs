//! Inference router - Per-request local/remote decision.
//!
//! The rule is deliberately small: local dispatch requires a ready model
//! and a preference that does not exclude it; everything else goes remote.
//! `Downloading` never qualifies, and routing never blocks waiting for
//! readiness. The remote-invocation counter is incremented at dispatch,
//! not at response, so a failed remote call still counts as remote usage.

use crate::chat::{ChatMessage, TaskKind};
use crate::error::OrchestratorError;
use crate::extract::{self, SkillGroups};
use crate::prefs::{InferenceMode, Preferences};
use crate::remote::RemoteService;
use crate::session::{GenerationCallbacks, StreamingSession};
use crate::state::{InferenceSource, SharedState};
use crate::telemetry::UsageTelemetry;
use log::{debug, info};
use std::sync::Arc;
use std::thread;

pub(crate) struct InferenceRouter {
    session: StreamingSession,
    remote: Arc<dyn RemoteService>,
    telemetry: UsageTelemetry,
    prefs: Preferences,
    shared: SharedState,
}

impl InferenceRouter {
    pub fn new(
        session: StreamingSession,
        remote: Arc<dyn RemoteService>,
        telemetry: UsageTelemetry,
        prefs: Preferences,
        shared: SharedState,
    ) -> Self {
        Self {
            session,
            remote,
            telemetry,
            prefs,
            shared,
        }
    }

    fn local_qualifies(&self) -> bool {
        self.shared.model_state().is_ready() && self.prefs.mode() != InferenceMode::PreferRemote
    }

    /// Route one generation request. Non-blocking; returns where it went.
    pub fn route(
        &self,
        messages: Vec<ChatMessage>,
        task: TaskKind,
        callbacks: GenerationCallbacks,
    ) -> InferenceSource {
        if self.local_qualifies() {
            info!("routing task={} to local engine", task.as_str());
            self.telemetry.record_local_dispatch();
            self.session.generate(messages, callbacks);
            InferenceSource::Local
        } else {
            debug!(
                "local path unavailable (state={}, mode={}), using remote",
                self.shared.model_state().as_str(),
                self.prefs.mode().as_str()
            );
            self.telemetry.record_remote_dispatch();
            self.dispatch_remote(messages, task, callbacks);
            InferenceSource::Remote
        }
    }

    /// Route one structured skill-organization request.
    pub fn route_organize(
        &self,
        skills: Vec<String>,
        on_complete: Arc<dyn Fn(SkillGroups) + Send + Sync>,
        on_error: Arc<dyn Fn(OrchestratorError) + Send + Sync>,
    ) -> InferenceSource {
        if self.local_qualifies() {
            info!("routing skill organization to local engine");
            self.telemetry.record_local_dispatch();

            let messages = extract::organize_prompt(&skills);
            let parse_errors = Arc::clone(&on_error);
            let callbacks = GenerationCallbacks::new(
                |_| {},
                move |text| match extract::parse_organized(text, InferenceSource::Local) {
                    Ok(groups) => on_complete(groups),
                    Err(e) => parse_errors(e),
                },
                move |e| on_error(e),
            );
            self.session.generate(messages, callbacks);
            InferenceSource::Local
        } else {
            debug!("routing skill organization to remote structured endpoint");
            self.telemetry.record_remote_dispatch();

            let remote = Arc::clone(&self.remote);
            let shared = self.shared.clone();
            shared.set_generating(true);
            thread::spawn(move || {
                let result = remote.organize(&skills);
                shared.set_generating(false);
                match result {
                    Ok(groups) => on_complete(groups),
                    Err(e) => on_error(OrchestratorError::RemoteService(e)),
                }
            });
            InferenceSource::Remote
        }
    }

    /// Run the remote call on a short-lived thread so routing never blocks.
    /// Whole response only: one `on_delta` with the full text, then
    /// `on_complete`, mirroring the streaming contract for callers that
    /// render incrementally.
    fn dispatch_remote(
        &self,
        messages: Vec<ChatMessage>,
        task: TaskKind,
        callbacks: GenerationCallbacks,
    ) {
        let remote = Arc::clone(&self.remote);
        let shared = self.shared.clone();
        shared.set_generating(true);
        thread::spawn(move || {
            let result = remote.generate(&messages, task);
            shared.set_generating(false);
            match result {
                Ok(text) => {
                    (callbacks.on_delta)(&text);
                    (callbacks.on_complete)(&text);
                }
                Err(e) => (callbacks.on_error)(OrchestratorError::RemoteService(e)),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferenceStore;
    use crate::state::ModelState;
    use crate::testing::MockRemote;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    fn router_with(remote: Arc<MockRemote>) -> (InferenceRouter, SharedState, Preferences) {
        let shared = SharedState::new();
        let prefs = Preferences::new(Box::new(MemoryPreferenceStore::new()));
        let (tx, _rx) = mpsc::channel();
        // The receiver is dropped: these tests only exercise remote routing.
        let session = StreamingSession::new(shared.clone(), tx);
        let telemetry = UsageTelemetry::new(prefs.clone(), shared.clone());
        let router = InferenceRouter::new(
            session,
            remote,
            telemetry,
            prefs.clone(),
            shared.clone(),
        );
        (router, shared, prefs)
    }

    fn wait_for<T>(rx: &mpsc::Receiver<T>) -> T {
        rx.recv_timeout(Duration::from_secs(2)).expect("callback")
    }

    // Senders go behind a Mutex: callbacks must be Sync.
    fn completion_channel() -> (GenerationCallbacks, mpsc::Receiver<String>) {
        let (done_tx, done_rx) = mpsc::channel();
        let done_tx = Mutex::new(done_tx);
        (
            GenerationCallbacks::new(
                |_| {},
                move |text| {
                    let _ = done_tx.lock().unwrap().send(text.to_string());
                },
                |e| panic!("unexpected error: {}", e),
            ),
            done_rx,
        )
    }

    #[test]
    fn test_not_ready_routes_remote_even_when_local_preferred() {
        let remote = Arc::new(MockRemote::with_response("from the cloud"));
        let (router, _shared, prefs) = router_with(Arc::clone(&remote));
        prefs.set_mode(InferenceMode::PreferLocal);

        let (callbacks, done_rx) = completion_channel();
        let source = router.route(vec![ChatMessage::user("hi")], TaskKind::General, callbacks);

        assert_eq!(source, InferenceSource::Remote);
        assert_eq!(wait_for(&done_rx), "from the cloud");
        assert_eq!(prefs.remote_invocation_count(), 1);
    }

    #[test]
    fn test_prefer_remote_overrides_ready_model() {
        let remote = Arc::new(MockRemote::with_response("cloud"));
        let (router, shared, prefs) = router_with(Arc::clone(&remote));
        shared.transition(ModelState::Ready);
        prefs.set_mode(InferenceMode::PreferRemote);

        let (callbacks, done_rx) = completion_channel();
        let source = router.route(vec![ChatMessage::user("hi")], TaskKind::General, callbacks);

        assert_eq!(source, InferenceSource::Remote);
        wait_for(&done_rx);
        assert_eq!(remote.generate_calls(), 1);
    }

    #[test]
    fn test_remote_failure_surfaces_and_counter_already_incremented() {
        let remote = Arc::new(MockRemote::failing(crate::remote::RemoteError::Network(
            "cable unplugged".to_string(),
        )));
        let (router, _shared, prefs) = router_with(remote);

        let (err_tx, err_rx) = mpsc::channel();
        let err_tx = Mutex::new(err_tx);
        let callbacks = GenerationCallbacks::new(
            |_| {},
            |_| panic!("unexpected completion"),
            move |e| {
                let _ = err_tx.lock().unwrap().send(e);
            },
        );

        router.route(vec![ChatMessage::user("hi")], TaskKind::General, callbacks);

        let err = wait_for(&err_rx);
        assert!(matches!(err, OrchestratorError::RemoteService(_)));
        assert_eq!(prefs.remote_invocation_count(), 1);
    }

    #[test]
    fn test_remote_organize_returns_prevalidated_groups() {
        let remote = Arc::new(MockRemote::with_response("unused"));
        let (router, _shared, _prefs) = router_with(remote);

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors_sink = Arc::clone(&errors);
        let source = router.route_organize(
            vec!["Python".to_string(), "SQL".to_string()],
            Arc::new(move |groups| {
                let _ = tx.lock().unwrap().send(groups);
            }),
            Arc::new(move |e| errors_sink.lock().unwrap().push(e)),
        );

        assert_eq!(source, InferenceSource::Remote);
        let groups = wait_for(&rx);
        assert_eq!(groups.source, InferenceSource::Remote);
        assert!(groups.categories.contains_key("Skills"));
        assert!(errors.lock().unwrap().is_empty());
    }
}
