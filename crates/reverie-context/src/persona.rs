// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Standard system prompt: persona paragraph plus the profile, retrieval and
//! style sections.

use reverie_config::model::AgentConfig;

use crate::retrieval::Retrieved;

/// Shown in place of the profile before any evidence exists.
pub const NO_PROFILE_PLACEHOLDER: &str = "No profile yet. You are just getting to know this \
person, so stay curious and ask open questions rather than assuming.";

/// Holds the persona paragraph that opens every standard system prompt.
#[derive(Debug, Clone)]
pub struct Persona {
    text: String,
}

impl Persona {
    /// Uses `agent.system_prompt` when set and non-empty, otherwise the
    /// default persona for `agent.name`.
    pub fn new(config: &AgentConfig) -> Self {
        let text = match config.system_prompt.as_deref().map(str::trim) {
            Some(prompt) if !prompt.is_empty() => prompt.to_string(),
            _ => format!(
                "You are {}, a warm and reflective journaling companion. Help the user \
                 explore their thoughts and feelings. Keep replies conversational and \
                 grounded in what they actually said.",
                config.name
            ),
        };
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Renders the full standard system prompt.
    pub fn standard_prompt(&self, profile: &str, retrieved: &Retrieved, style: &str) -> String {
        let mut prompt = self.text.clone();
        push_profile(&mut prompt, profile);
        push_retrieved(&mut prompt, retrieved);
        prompt.push_str("\n\n## Style\n");
        prompt.push_str(style);
        prompt
    }
}

/// Appends the journey prompt's context sections. Journeys carry no style layer.
pub fn journey_prompt(system_prompt: &str, profile: &str, retrieved: &Retrieved) -> String {
    let mut prompt = system_prompt.trim().to_string();
    push_profile(&mut prompt, profile);
    push_retrieved(&mut prompt, retrieved);
    prompt
}

fn push_profile(prompt: &mut String, profile: &str) {
    prompt.push_str("\n\n## What you know about the user\n");
    if profile.trim().is_empty() {
        prompt.push_str(NO_PROFILE_PLACEHOLDER);
    } else {
        prompt.push_str(profile);
    }
}

fn push_retrieved(prompt: &mut String, retrieved: &Retrieved) {
    if !retrieved.messages.is_empty() {
        prompt.push_str("\n\n## Related past entries\n");
        for entry in &retrieved.messages {
            prompt.push_str(&format!("- {entry}\n"));
        }
        trim_newline(prompt);
    }
    if !retrieved.insights.is_empty() {
        prompt.push_str("\n\n## Related insights\n");
        for insight in &retrieved.insights {
            prompt.push_str(&format!("- {insight}\n"));
        }
        trim_newline(prompt);
    }
}

fn trim_newline(prompt: &mut String) {
    if prompt.ends_with('\n') {
        prompt.pop();
    }
}
