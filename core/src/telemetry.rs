//! Usage telemetry and nudge policy.
//!
//! Counts confirmed remote dispatches (persisted) and remembers where the
//! last request was served (transient). The nudge policy turns those into
//! two UI signals: "suggest switching to local inference" once remote usage
//! crosses a threshold, and "offer initial setup" for fresh installs that
//! never declined.

use crate::prefs::{InferenceMode, Preferences};
use crate::state::{InferenceSource, SharedState};

/// Remote dispatches before suggesting the local path.
pub const NUDGE_THRESHOLD: u64 = 3;

/// Cloneable telemetry handle shared by the router and the facade.
#[derive(Clone)]
pub struct UsageTelemetry {
    prefs: Preferences,
    shared: SharedState,
}

impl UsageTelemetry {
    pub(crate) fn new(prefs: Preferences, shared: SharedState) -> Self {
        Self { prefs, shared }
    }

    /// Record a local dispatch. Never touches the remote counter.
    pub(crate) fn record_local_dispatch(&self) {
        self.shared.set_last_source(InferenceSource::Local);
    }

    /// Record a confirmed remote dispatch. Incremented at dispatch time,
    /// not at response time, so failed remote calls still count.
    pub(crate) fn record_remote_dispatch(&self) {
        self.prefs.increment_remote_invocations();
        self.shared.set_last_source(InferenceSource::Remote);
    }

    pub fn remote_invocation_count(&self) -> u64 {
        self.prefs.remote_invocation_count()
    }

    pub fn last_source(&self) -> Option<InferenceSource> {
        self.shared.last_source()
    }

    /// Suggest enabling local inference: the model is neither ready nor
    /// loading, remote usage crossed the threshold, and the user never
    /// declined.
    pub fn should_suggest_local(&self) -> bool {
        let state = self.shared.model_state();
        !state.is_ready()
            && !state.is_downloading()
            && self.prefs.remote_invocation_count() >= NUDGE_THRESHOLD
            && !self.prefs.declined_local()
    }

    /// Offer first-time setup: nothing loaded or loading, mode untouched,
    /// no decline on record.
    pub fn should_offer_initial_setup(&self) -> bool {
        let state = self.shared.model_state();
        state == crate::state::ModelState::Uninitialized
            && !self.prefs.declined_local()
            && self.prefs.mode() == InferenceMode::Auto
    }

    /// Dismiss the nudge by zeroing the counter. Independent of the
    /// declined flag: "maybe later" is not a decline.
    pub fn dismiss_nudge(&self) {
        self.prefs.reset_remote_invocations();
    }
}
