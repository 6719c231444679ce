// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Narrative summary synthesis.

use reverie_core::{ChatMessage, GenerateOptions, NarrativeSummary, ProviderAdapter, ReverieError};
use serde::Deserialize;

use crate::profile::Profile;
use crate::schema::json_object;

pub(crate) const NARRATIVE_SYSTEM_PROMPT: &str = r#"You maintain a private, compassionate narrative about the person keeping this journal.
Using only the profile evidence provided, write a JSON object with exactly these keys:
- "identity_summary": two or three sentences describing who this person is right now
- "current_phase": a short phrase naming the life phase they are in
- "emotional_baseline": a short phrase describing their usual emotional state
- "primary_concerns": array of short strings
- "patterns_to_watch": array of short strings
- "recent_wins": array of short strings
- "recent_struggles": array of short strings
Do not invent facts that the evidence does not support. Output JSON only."#;

/// True when the narrative should be regenerated: there is none yet, or at
/// least `interval` user messages arrived since the last one.
pub fn should_regenerate(
    current: Option<&NarrativeSummary>,
    user_message_count: i64,
    interval: u32,
) -> bool {
    match current {
        None => true,
        Some(narrative) => user_message_count - narrative.message_count >= i64::from(interval),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NarrativeDraft {
    identity_summary: String,
    current_phase: String,
    emotional_baseline: String,
    primary_concerns: Vec<String>,
    patterns_to_watch: Vec<String>,
    recent_wins: Vec<String>,
    recent_struggles: Vec<String>,
}

/// Asks the provider for a fresh narrative built from `profile`.
pub async fn synthesize(
    provider: &dyn ProviderAdapter,
    profile: &Profile,
    previous: Option<&NarrativeSummary>,
    user_message_count: i64,
    max_tokens: u32,
    now: &str,
) -> Result<NarrativeSummary, ReverieError> {
    let mut prompt = format!("Profile evidence:\n{}\n", profile.summary_text(None));
    if let Some(previous) = previous.filter(|p| !p.identity_summary.is_empty()) {
        prompt.push_str(&format!(
            "\nPrevious narrative (update it, do not repeat it blindly):\n{}\n",
            previous.identity_summary
        ));
    }

    let options = GenerateOptions {
        max_tokens,
        temperature: Some(0.3),
    };
    let response = provider
        .generate_text(
            &[ChatMessage::user(prompt)],
            Some(NARRATIVE_SYSTEM_PROMPT),
            &options,
        )
        .await?;

    let draft = parse_draft(&response)?;
    Ok(NarrativeSummary {
        identity_summary: draft.identity_summary.trim().to_string(),
        current_phase: draft.current_phase.trim().to_string(),
        emotional_baseline: draft.emotional_baseline.trim().to_string(),
        primary_concerns: clean(draft.primary_concerns),
        patterns_to_watch: clean(draft.patterns_to_watch),
        recent_wins: clean(draft.recent_wins),
        recent_struggles: clean(draft.recent_struggles),
        message_count: user_message_count,
        updated_at: now.to_string(),
    })
}

fn parse_draft(response: &str) -> Result<NarrativeDraft, ReverieError> {
    let json = json_object(response)
        .ok_or_else(|| ReverieError::Validation("narrative response is not JSON".into()))?;
    let draft: NarrativeDraft = serde_json::from_str(json)
        .map_err(|e| ReverieError::Validation(format!("unparseable narrative: {e}")))?;
    if draft.identity_summary.trim().is_empty() {
        return Err(ReverieError::Validation(
            "narrative has an empty identity summary".into(),
        ));
    }
    Ok(draft)
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverie_test_utils::MockProvider;

    #[test]
    fn first_narrative_always_regenerates() {
        assert!(should_regenerate(None, 1, 10));
    }

    #[test]
    fn regenerates_every_interval() {
        let current = NarrativeSummary {
            message_count: 3,
            ..Default::default()
        };
        assert!(!should_regenerate(Some(&current), 12, 10));
        assert!(should_regenerate(Some(&current), 13, 10));
    }

    #[tokio::test]
    async fn synthesize_parses_and_cleans() {
        let provider = MockProvider::with_responses(vec![r#"Here you go:
{"identity_summary": " A careful planner. ", "current_phase": "transition",
 "primary_concerns": ["work", "  "], "recent_wins": ["ran 5k"], "extra": 1}"#
            .to_string()]);

        let narrative = synthesize(&provider, &Profile::default(), None, 4, 512, "t1")
            .await
            .unwrap();
        assert_eq!(narrative.identity_summary, "A careful planner.");
        assert_eq!(narrative.primary_concerns, vec!["work".to_string()]);
        assert_eq!(narrative.recent_wins, vec!["ran 5k".to_string()]);
        assert!(narrative.patterns_to_watch.is_empty());
        assert_eq!(narrative.message_count, 4);
        assert_eq!(narrative.updated_at, "t1");

        let requests = provider.requests().await;
        assert_eq!(requests[0].system.as_deref(), Some(NARRATIVE_SYSTEM_PROMPT));
    }

    #[tokio::test]
    async fn empty_identity_is_rejected() {
        let provider = MockProvider::with_responses(vec!["{\"current_phase\": \"x\"}".into()]);
        let err = synthesize(&provider, &Profile::default(), None, 1, 512, "t1")
            .await
            .unwrap_err();
        assert!(matches!(err, ReverieError::Validation(_)));
    }
}
