//! Structured extraction - Classification prompts with typed results.
//!
//! Skill organization is a single-shot generation whose output is expected
//! to parse into [`SkillGroups`] rather than read as free text. The local
//! model is asked for a bare JSON object; the completed text is scanned for
//! the first balanced `{...}` span and parsed with serde. A miss is a
//! [`OrchestratorError::StructuredParse`], never a generation failure, and
//! is surfaced as-is; the calling feature decides whether to retry.

use crate::chat::ChatMessage;
use crate::error::OrchestratorError;
use crate::state::InferenceSource;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Most high-impact skills to surface alongside the category breakdown.
pub const MAX_HIGHLIGHTS: usize = 5;

/// Skills grouped into professional categories, with the top picks called
/// out. `highlights` never exceeds [`MAX_HIGHLIGHTS`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkillGroups {
    pub categories: BTreeMap<String, Vec<String>>,
    pub highlights: Vec<String>,
    pub source: InferenceSource,
}

/// Wire shape shared by the local prompt contract and the remote
/// structured endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct SkillGroupsWire {
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl SkillGroupsWire {
    pub(crate) fn into_groups(mut self, source: InferenceSource) -> SkillGroups {
        self.highlights.truncate(MAX_HIGHLIGHTS);
        SkillGroups {
            categories: self.categories,
            highlights: self.highlights,
            source,
        }
    }
}

/// Build the single-shot skill-organization prompt.
pub fn organize_prompt(skills: &[String]) -> Vec<ChatMessage> {
    let user = format!(
        "Analyze the following list of skills and group them into logical \
         professional categories. Also identify the {} most high-impact, \
         marketable skills from the list.\n\n\
         Return ONLY a valid JSON object with this structure:\n\
         {{\n  \"categories\": {{\"Programming Languages\": [\"Python\"], \"Soft Skills\": [\"Leadership\"]}},\n  \"highlights\": [\"Python\", \"Leadership\"]\n}}\n\n\
         Skills list: {}",
        MAX_HIGHLIGHTS,
        skills.join(", ")
    );

    vec![
        ChatMessage::system("You are an expert resume optimizer. Categorize skills professionally."),
        ChatMessage::user(user),
    ]
}

/// Parse a completed generation into [`SkillGroups`].
pub fn parse_organized(
    text: &str,
    source: InferenceSource,
) -> Result<SkillGroups, OrchestratorError> {
    let span = balanced_json_span(text).ok_or_else(|| {
        OrchestratorError::StructuredParse("no balanced JSON object in completed text".to_string())
    })?;

    let wire: SkillGroupsWire = serde_json::from_str(span)
        .map_err(|e| OrchestratorError::StructuredParse(e.to_string()))?;

    Ok(wire.into_groups(source))
}

/// Find the first balanced `{...}` span, ignoring braces inside JSON
/// strings. Models love to wrap their JSON in prose or code fences.
fn balanced_json_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if let Some(s) = start {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    None
}
