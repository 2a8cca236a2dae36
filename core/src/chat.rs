//! Chat request types - Role-tagged messages and task tags.
//!
//! A generation request is an ordered list of [`ChatMessage`]s submitted as
//! one atomic unit. The [`TaskKind`] tag travels with remote requests so the
//! inference API can select a task-specific system prompt.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message in a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The feature a generation request originates from.
///
/// Serialized kebab-case on the remote wire (`taskType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    General,
    SkillOrganization,
    SearchSuggestions,
    OnboardingChat,
    ProfileEnhancement,
}

impl TaskKind {
    /// Wire string used by the remote generation endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::General => "general",
            TaskKind::SkillOrganization => "skill-organization",
            TaskKind::SearchSuggestions => "search-suggestions",
            TaskKind::OnboardingChat => "onboarding-chat",
            TaskKind::ProfileEnhancement => "profile-enhancement",
        }
    }
}

impl Default for TaskKind {
    fn default() -> Self {
        TaskKind::General
    }
}
