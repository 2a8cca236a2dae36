//! Test doubles for the engine and remote seams.
//!
//! These run the orchestrator end-to-end without model files or a network:
//! [`ScriptedEngine`] plays back configured load steps and deltas,
//! [`MockRemote`] answers with canned responses. Both count their calls so
//! tests can assert on dispatch behavior.

use crate::chat::{ChatMessage, TaskKind};
use crate::engine::{EngineError, EngineFactory, LoadProgress, LocalEngine};
use crate::extract::SkillGroups;
use crate::remote::{RemoteError, RemoteService};
use crate::state::InferenceSource;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One engine's scripted behavior.
#[derive(Debug, Clone, Default)]
pub struct EngineScript {
    /// Progress reports emitted during `load`.
    pub load_steps: Vec<LoadProgress>,
    /// If set, `load` fails with this message after the steps.
    pub load_failure: Option<String>,
    /// Chunks emitted by `generate`; the full text is their concatenation.
    pub deltas: Vec<String>,
    /// If set, `generate` fails with this message instead.
    pub generation_failure: Option<String>,
    /// Sleep inserted after the progress steps, to hold the model in its
    /// loading phase long enough for tests to observe it.
    pub load_delay_ms: u64,
}

impl EngineScript {
    pub fn with_load_step(mut self, message: &str, fraction: f32) -> Self {
        self.load_steps.push(LoadProgress::new(message, fraction));
        self
    }

    pub fn with_load_failure(mut self, message: &str) -> Self {
        self.load_failure = Some(message.to_string());
        self
    }

    pub fn with_deltas<I, S>(mut self, deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deltas = deltas.into_iter().map(Into::into).collect();
        self
    }

    /// Single-delta convenience.
    pub fn with_response(self, text: &str) -> Self {
        self.with_deltas([text])
    }

    pub fn with_generation_failure(mut self, message: &str) -> Self {
        self.generation_failure = Some(message.to_string());
        self
    }

    pub fn with_load_delay_ms(mut self, delay_ms: u64) -> Self {
        self.load_delay_ms = delay_ms;
        self
    }
}

/// Factory handing out [`ScriptedEngine`]s.
///
/// Scripts are consumed in order, one per `create` call; the last script
/// repeats once the queue is empty, so a fail-then-succeed sequence can
/// model a retried load.
pub struct ScriptedEngineFactory {
    scripts: Mutex<VecDeque<EngineScript>>,
    last: Mutex<EngineScript>,
    created: AtomicUsize,
    generate_calls: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedEngineFactory {
    pub fn new(script: EngineScript) -> Self {
        Self::with_scripts(vec![script])
    }

    pub fn with_scripts(scripts: Vec<EngineScript>) -> Self {
        let last = scripts.last().cloned().unwrap_or_default();
        Self {
            scripts: Mutex::new(scripts.into()),
            last: Mutex::new(last),
            created: AtomicUsize::new(0),
            generate_calls: Arc::new(AtomicUsize::new(0)),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn create(&self, _model_id: &str) -> Result<Box<dyn LocalEngine>, EngineError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.lock().unwrap().clone());
        Ok(Box::new(ScriptedEngine {
            script,
            generate_calls: Arc::clone(&self.generate_calls),
            resets: Arc::clone(&self.resets),
        }))
    }
}

/// Engine that plays back an [`EngineScript`].
pub struct ScriptedEngine {
    script: EngineScript,
    generate_calls: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl LocalEngine for ScriptedEngine {
    fn load(&mut self, on_progress: &mut dyn FnMut(LoadProgress)) -> Result<(), EngineError> {
        for step in &self.script.load_steps {
            on_progress(step.clone());
        }
        if self.script.load_delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(self.script.load_delay_ms));
        }
        match self.script.load_failure {
            Some(ref message) => Err(EngineError::Load(message.clone())),
            None => Ok(()),
        }
    }

    fn generate(
        &mut self,
        _messages: &[ChatMessage],
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, EngineError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.script.generation_failure {
            return Err(EngineError::Inference(message.clone()));
        }
        let mut full = String::new();
        for delta in &self.script.deltas {
            on_token(delta);
            full.push_str(delta);
        }
        Ok(full)
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Canned remote service.
pub struct MockRemote {
    response: Mutex<Result<String, RemoteError>>,
    organize_response: Mutex<Option<Result<SkillGroups, RemoteError>>>,
    generate_calls: AtomicUsize,
    organize_calls: AtomicUsize,
}

impl MockRemote {
    pub fn with_response(text: &str) -> Self {
        Self {
            response: Mutex::new(Ok(text.to_string())),
            organize_response: Mutex::new(None),
            generate_calls: AtomicUsize::new(0),
            organize_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: RemoteError) -> Self {
        Self {
            response: Mutex::new(Err(error.clone())),
            organize_response: Mutex::new(Some(Err(error))),
            generate_calls: AtomicUsize::new(0),
            organize_calls: AtomicUsize::new(0),
        }
    }

    /// Override the structured-organization answer.
    pub fn set_organize_response(&self, result: Result<SkillGroups, RemoteError>) {
        *self.organize_response.lock().unwrap() = Some(result);
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn organize_calls(&self) -> usize {
        self.organize_calls.load(Ordering::SeqCst)
    }
}

impl RemoteService for MockRemote {
    fn generate(&self, _messages: &[ChatMessage], _task: TaskKind) -> Result<String, RemoteError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.response.lock().unwrap().clone()
    }

    fn organize(&self, skills: &[String]) -> Result<SkillGroups, RemoteError> {
        self.organize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref canned) = *self.organize_response.lock().unwrap() {
            return canned.clone();
        }
        // Default: everything in one bucket, first picks highlighted, the
        // shape a pre-validated server response would have.
        let mut categories = BTreeMap::new();
        categories.insert("Skills".to_string(), skills.to_vec());
        Ok(SkillGroups {
            categories,
            highlights: skills.iter().take(crate::extract::MAX_HIGHLIGHTS).cloned().collect(),
            source: InferenceSource::Remote,
        })
    }
}
