//! Preference store - Persisted key-value state behind a trait seam.
//!
//! The orchestrator never touches ambient storage directly: it goes through
//! an injected [`PreferenceStore`] (`get`/`set`/`remove`). Two impls ship
//! with the crate: a JSON-file store for applications and an in-memory store
//! for tests. The typed [`Preferences`] wrapper owns the key names, the
//! string encoding, and the defaults.

use log::warn;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// How the user wants inference routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    /// Use the local model when ready, remote otherwise.
    Auto,
    /// Same routing as `Auto`; records an explicit opt-in to local inference.
    PreferLocal,
    /// Never dispatch locally.
    PreferRemote,
}

impl InferenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceMode::Auto => "auto",
            InferenceMode::PreferLocal => "prefer-local",
            InferenceMode::PreferRemote => "prefer-remote",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(InferenceMode::Auto),
            "prefer-local" => Some(InferenceMode::PreferLocal),
            "prefer-remote" => Some(InferenceMode::PreferRemote),
            _ => None,
        }
    }
}

impl Default for InferenceMode {
    fn default() -> Self {
        InferenceMode::Auto
    }
}

/// String-keyed persisted storage. Assumed single-writer (one process);
/// concurrent writers from other processes are explicitly unguarded.
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    map: HashMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }
}

/// JSON-file-backed store, write-through on every mutation.
///
/// A persist failure is logged and swallowed: preferences degrade to
/// session-local rather than failing the request that touched them.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    map: HashMap<String, String>,
}

impl FilePreferenceStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let map = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("preference file {:?} is corrupt ({}), starting fresh", path, e);
                HashMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e),
        };

        Ok(Self { path, map })
    }

    /// Open the store in the default location, `~/.vitae/preferences.json`.
    pub fn default_location() -> io::Result<Self> {
        let mut path = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not determine home directory")
        })?;
        path.push(".vitae");
        path.push("preferences.json");
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        let contents = match serde_json::to_string_pretty(&self.map) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("failed to serialize preferences: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, contents) {
            warn!("failed to persist preferences to {:?}: {}", self.path, e);
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
        self.persist();
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
        self.persist();
    }
}

const KEY_MODE: &str = "mode";
const KEY_DECLINED_LOCAL: &str = "declined_local";
const KEY_CACHED_MODEL: &str = "cached_model_present";
const KEY_REMOTE_COUNT: &str = "remote_invocation_count";

/// Typed, cloneable view over a [`PreferenceStore`].
///
/// Holds the persisted defaults (`mode=auto`, `declined_local=false`,
/// `cached_model_present=false`, `remote_invocation_count=0`) and the one
/// coupling rule: preferring remote is also a decline of local inference.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<Mutex<Box<dyn PreferenceStore>>>,
}

impl Preferences {
    pub fn new(store: Box<dyn PreferenceStore>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.store.lock().ok().and_then(|s| s.get(key))
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut store) = self.store.lock() {
            store.set(key, value);
        }
    }

    pub fn mode(&self) -> InferenceMode {
        self.get(KEY_MODE)
            .and_then(|v| InferenceMode::parse(&v))
            .unwrap_or_default()
    }

    /// Persist the routing mode. `PreferRemote` also records a decline of
    /// local inference, keeping the two fields consistent.
    pub fn set_mode(&self, mode: InferenceMode) {
        self.set(KEY_MODE, mode.as_str());
        if mode == InferenceMode::PreferRemote {
            self.set(KEY_DECLINED_LOCAL, "true");
        }
    }

    pub fn declined_local(&self) -> bool {
        self.get(KEY_DECLINED_LOCAL)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    pub fn set_declined_local(&self, declined: bool) {
        self.set(KEY_DECLINED_LOCAL, if declined { "true" } else { "false" });
    }

    pub fn cached_model_present(&self) -> bool {
        self.get(KEY_CACHED_MODEL)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    pub fn set_cached_model_present(&self, present: bool) {
        self.set(KEY_CACHED_MODEL, if present { "true" } else { "false" });
    }

    pub fn remote_invocation_count(&self) -> u64 {
        self.get(KEY_REMOTE_COUNT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Increment and return the new count.
    pub fn increment_remote_invocations(&self) -> u64 {
        let next = self.remote_invocation_count() + 1;
        self.set(KEY_REMOTE_COUNT, &next.to_string());
        next
    }

    pub fn reset_remote_invocations(&self) {
        self.set(KEY_REMOTE_COUNT, "0");
    }
}
