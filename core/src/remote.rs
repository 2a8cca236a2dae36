//! Remote inference client - The server-side fallback path.
//!
//! Two endpoints, both whole-response (no streaming deltas):
//! - `POST {base}/ai/generate` with `{messages, taskType}` → `{response}`
//! - `POST {base}/ai/organize-skills` with `{skills}` → pre-validated
//!   `{categories, highlights}`
//!
//! The trait seam lets tests substitute a mock; [`HttpRemoteClient`] is the
//! production implementation. Every call carries the configured timeout.
//! There is no automatic retry; failures surface to the caller.

use crate::chat::{ChatMessage, TaskKind};
use crate::config::OrchestratorConfig;
use crate::extract::{SkillGroups, SkillGroupsWire};
use crate::state::InferenceSource;
use log::debug;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors from the remote inference service.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The API answered with an error status.
    #[error("remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("network error: {0}")]
    Network(String),

    /// The call exceeded the configured timeout.
    #[error("remote request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u32 },

    /// The response body did not match the expected shape.
    #[error("failed to parse remote response: {0}")]
    Parse(String),
}

/// The remote inference service, as consumed by the router.
pub trait RemoteService: Send + Sync {
    /// Whole-response generation.
    fn generate(&self, messages: &[ChatMessage], task: TaskKind) -> Result<String, RemoteError>;

    /// Structured skill organization. The server validates the shape before
    /// answering, so the result needs no local re-parsing.
    fn organize(&self, skills: &[String]) -> Result<SkillGroups, RemoteError>;
}

/// HTTP client for the remote inference API.
pub struct HttpRemoteClient {
    base_url: String,
    token: Option<String>,
    timeout_ms: u32,
    debug: bool,
    agent: ureq::Agent,
}

impl HttpRemoteClient {
    pub fn new(config: &OrchestratorConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.remote_timeout_ms as u64))
            .build();

        Self {
            base_url: config.remote_base_url.trim_end_matches('/').to_string(),
            token: config.resolve_api_token(),
            timeout_ms: config.remote_timeout_ms,
            debug: config.debug,
            agent,
        }
    }

    fn post(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value, RemoteError> {
        let url = format!("{}{}", self.base_url, path);

        if self.debug {
            debug!("remote request to {}: {}", url, body);
        }

        let mut request = self.agent.post(&url).set("Content-Type", "application/json");
        if let Some(ref token) = self.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        match request.send_json(&body) {
            Ok(response) => response
                .into_json()
                .map_err(|e| RemoteError::Parse(e.to_string())),
            Err(ureq::Error::Status(status, response)) => {
                let message = response
                    .into_json::<serde_json::Value>()
                    .ok()
                    .and_then(|v| {
                        v["message"]
                            .as_str()
                            .or_else(|| v["error"].as_str())
                            .map(|s| s.to_string())
                    })
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(RemoteError::Api { status, message })
            }
            Err(ureq::Error::Transport(transport)) => {
                let message = transport.to_string();
                if message.contains("timed out") || message.contains("timeout") {
                    Err(RemoteError::Timeout {
                        timeout_ms: self.timeout_ms,
                    })
                } else {
                    Err(RemoteError::Network(message))
                }
            }
        }
    }
}

impl RemoteService for HttpRemoteClient {
    fn generate(&self, messages: &[ChatMessage], task: TaskKind) -> Result<String, RemoteError> {
        let body = json!({
            "messages": messages,
            "taskType": task.as_str(),
        });

        let response = self.post("/ai/generate", body)?;

        response["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| RemoteError::Parse("missing `response` field".to_string()))
    }

    fn organize(&self, skills: &[String]) -> Result<SkillGroups, RemoteError> {
        let body = json!({ "skills": skills });

        let response = self.post("/ai/organize-skills", body)?;

        let wire: SkillGroupsWire = serde_json::from_value(response)
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        Ok(wire.into_groups(InferenceSource::Remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction_strips_trailing_slash() {
        let config = OrchestratorConfig::default().with_remote_base_url("http://localhost:9000/");
        let client = HttpRemoteClient::new(&config);
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_unreachable_host_is_a_network_error() {
        // Reserved TEST-NET-1 address: connections fail fast without DNS.
        let config = OrchestratorConfig::default()
            .with_remote_base_url("http://192.0.2.1:9")
            .with_remote_timeout(300);
        let client = HttpRemoteClient::new(&config);

        let err = client
            .generate(&[ChatMessage::user("hi")], TaskKind::General)
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Network(_) | RemoteError::Timeout { .. }
        ));
    }
}
