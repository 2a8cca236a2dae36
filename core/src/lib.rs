//! Vitae Core - Adaptive local/remote AI inference runtime.
//!
//! Every AI-powered feature of the application (chat assistants, skill
//! categorization, gap-question generation) talks to one
//! [`Orchestrator`]: a uniform request/response contract that transparently
//! chooses between an on-device model running in a background worker thread
//! and the remote inference API, tracks load progress, streams partial
//! output, and decides when to nudge the user toward the faster local path.
//!
//! ## Module Organization
//!
//! ### Facade
//! - [`orchestrator`] - Composition root, `start`/`stop`, routing entry points
//! - [`config`] - Orchestrator configuration
//!
//! ### Routing & Sessions
//! - [`router`] - Per-request local/remote decision
//! - [`session`] - Streaming callbacks and correlation ids
//! - [`lifecycle`] - Model load state machine and auto-init
//! - [`telemetry`] - Usage counters and the nudge policy
//!
//! ### Background Context
//! - [`worker`] - The thread owning the on-device engine
//! - [`protocol`] - Typed channel messages
//! - [`engine`] - The injected engine capability
//!
//! ### Collaborators & Data
//! - [`remote`] - Remote inference API client
//! - [`extract`] - Structured skill extraction
//! - [`prefs`] - Persisted preference store
//! - [`chat`] - Role-tagged messages and task kinds
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitae_core::{
//!     GenerationCallbacks, HttpRemoteClient, MemoryPreferenceStore, Orchestrator,
//!     OrchestratorConfig, ChatMessage, TaskKind,
//! };
//! use vitae_core::testing::{EngineScript, ScriptedEngineFactory};
//!
//! let config = OrchestratorConfig::default();
//! let remote = Arc::new(HttpRemoteClient::new(&config));
//! let engine = Arc::new(ScriptedEngineFactory::new(EngineScript::default()));
//!
//! let mut ai = Orchestrator::new(config, engine, remote, Box::new(MemoryPreferenceStore::new()));
//! ai.start();
//!
//! let source = ai.generate_with_fallback(
//!     vec![ChatMessage::user("Improve this bullet point: shipped stuff")],
//!     TaskKind::ProfileEnhancement,
//!     GenerationCallbacks::new(
//!         |delta| print!("{}", delta),
//!         |_full| println!(),
//!         |err| eprintln!("generation failed: {}", err),
//!     ),
//! ).unwrap();
//! println!("served by: {}", source.as_str());
//! ```

/// Composition root and host-facing operations
pub mod orchestrator;

/// Orchestrator configuration
pub mod config;

/// Per-request local/remote routing
mod router;

/// Streaming session: callback slot and correlation ids
pub mod session;

/// Model lifecycle: load state machine and auto-init
pub mod lifecycle;

/// Usage telemetry and nudge policy
pub mod telemetry;

/// Background worker thread owning the engine
mod worker;

/// Typed messages between host and worker
pub mod protocol;

/// The injected on-device engine capability
pub mod engine;

/// Remote inference API client
pub mod remote;

/// Structured skill extraction
pub mod extract;

/// Persisted preference store
pub mod prefs;

/// Role-tagged chat messages and task kinds
pub mod chat;

/// Shared model/session state types
mod state;

/// Error types surfaced through callbacks
pub mod error;

/// Scripted engines and canned remotes for tests
pub mod testing;

pub use chat::{ChatMessage, Role, TaskKind};
pub use config::OrchestratorConfig;
pub use engine::{EngineError, EngineFactory, LoadProgress, LocalEngine};
pub use error::OrchestratorError;
pub use extract::{SkillGroups, MAX_HIGHLIGHTS};
pub use lifecycle::LifecycleController;
pub use orchestrator::Orchestrator;
pub use prefs::{
    FilePreferenceStore, InferenceMode, MemoryPreferenceStore, PreferenceStore, Preferences,
};
pub use remote::{HttpRemoteClient, RemoteError, RemoteService};
pub use session::{GenerationCallbacks, StreamingSession};
pub use state::{InferenceSource, ModelState};
pub use telemetry::{UsageTelemetry, NUDGE_THRESHOLD};
