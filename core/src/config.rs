//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the inference orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Model loaded when `initialize_model` is called without an explicit id.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Base URL of the remote inference API.
    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,

    /// Bearer token for the remote API. Can be:
    /// - Direct value (for testing)
    /// - Environment variable reference: `$VITAE_API_TOKEN`
    #[serde(default)]
    pub api_token: Option<String>,

    /// Timeout applied to every remote HTTP call, in milliseconds.
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u32,

    /// Delay before auto-initializing a cached model after `start`, giving
    /// the worker thread time to come alive.
    #[serde(default = "default_auto_init_delay_ms")]
    pub auto_init_delay_ms: u64,

    /// Enable request/response logging (for debugging).
    #[serde(default)]
    pub debug: bool,
}

fn default_model_id() -> String {
    "phi-3-mini-4k-instruct-q4".to_string()
}

fn default_remote_base_url() -> String {
    "https://api.vitae.dev".to_string()
}

fn default_remote_timeout_ms() -> u32 {
    30_000
}

fn default_auto_init_delay_ms() -> u64 {
    400
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            remote_base_url: default_remote_base_url(),
            api_token: None,
            remote_timeout_ms: default_remote_timeout_ms(),
            auto_init_delay_ms: default_auto_init_delay_ms(),
            debug: false,
        }
    }
}

impl OrchestratorConfig {
    /// Set the default model id.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Set the remote API base URL.
    pub fn with_remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.remote_base_url = url.into();
        self
    }

    /// Set the remote API token.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the remote call timeout.
    pub fn with_remote_timeout(mut self, timeout_ms: u32) -> Self {
        self.remote_timeout_ms = timeout_ms;
        self
    }

    /// Set the auto-init delay.
    pub fn with_auto_init_delay(mut self, delay_ms: u64) -> Self {
        self.auto_init_delay_ms = delay_ms;
        self
    }

    /// Enable debug logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Resolve the API token from the config or the environment.
    pub fn resolve_api_token(&self) -> Option<String> {
        if let Some(ref token) = self.api_token {
            if let Some(env_var) = token.strip_prefix('$') {
                return std::env::var(env_var).ok();
            }
            return Some(token.clone());
        }
        std::env::var("VITAE_API_TOKEN").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.remote_timeout_ms, 30_000);
        assert!(config.remote_base_url.contains("vitae"));
        assert!(!config.debug);
    }

    #[test]
    fn test_builders() {
        let config = OrchestratorConfig::default()
            .with_model_id("tiny-llama")
            .with_remote_base_url("http://localhost:9000")
            .with_remote_timeout(5_000)
            .with_auto_init_delay(10);

        assert_eq!(config.model_id, "tiny-llama");
        assert_eq!(config.remote_base_url, "http://localhost:9000");
        assert_eq!(config.remote_timeout_ms, 5_000);
        assert_eq!(config.auto_init_delay_ms, 10);
    }

    #[test]
    fn test_resolve_api_token_from_env() {
        std::env::set_var("TEST_VITAE_TOKEN", "secret123");

        let config = OrchestratorConfig::default().with_api_token("$TEST_VITAE_TOKEN");
        assert_eq!(config.resolve_api_token(), Some("secret123".to_string()));

        std::env::remove_var("TEST_VITAE_TOKEN");
    }

    #[test]
    fn test_resolve_api_token_direct() {
        let config = OrchestratorConfig::default().with_api_token("literal-token");
        assert_eq!(config.resolve_api_token(), Some("literal-token".to_string()));
    }
}
