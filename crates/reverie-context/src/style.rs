// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response style guidance derived from the profile.

use reverie_core::{Evidence, SignalCategory};
use reverie_memory::Profile;

/// Used when neither a support style nor a current intent is known.
pub const ADAPTIVE_DIRECTIVE: &str = "Be adaptive: notice whether the user wants to vent, \
reflect, or solve a problem, and match that. When unsure, reflect back what you heard and ask.";

/// The most recent immediate intent expressed in `conversation_id`. Intents
/// from other conversations are stale and never count.
pub fn current_intent<'a>(evidence: &'a [Evidence], conversation_id: &str) -> Option<&'a Evidence> {
    evidence
        .iter()
        .filter(|e| e.category == SignalCategory::ImmediateIntent)
        .filter(|e| e.conversation_id == conversation_id)
        .max_by(|a, b| a.created_at.cmp(&b.created_at))
}

/// Builds style guidance from the profile's latest support-seeking style and
/// the conversation's current intent.
pub fn style_guidance(profile: &Profile, intent: Option<&Evidence>) -> String {
    let support = profile.latest(SignalCategory::SupportStyle);

    let mut lines = Vec::new();
    if let Some(signal) = support {
        lines.push(format!(
            "The user usually prefers {} support. Lean into that style.",
            signal.label
        ));
    }
    if let Some(signal) = intent {
        lines.push(format!(
            "Right now they seem to want: {}. Prioritise that.",
            signal.label
        ));
    }

    if lines.is_empty() {
        ADAPTIVE_DIRECTIVE.to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(category: SignalCategory, label: &str, created_at: &str) -> Evidence {
        evidence_in("c1", category, label, created_at)
    }

    fn evidence_in(
        conversation_id: &str,
        category: SignalCategory,
        label: &str,
        created_at: &str,
    ) -> Evidence {
        Evidence {
            id: format!("e-{label}"),
            extraction_id: "x1".into(),
            message_id: "m1".into(),
            conversation_id: conversation_id.into(),
            category,
            label: label.into(),
            detail: None,
            confidence: 0.8,
            quote: "quote".into(),
            created_at: created_at.into(),
        }
    }

    #[test]
    fn unknown_style_is_adaptive() {
        assert_eq!(style_guidance(&Profile::default(), None), ADAPTIVE_DIRECTIVE);
    }

    #[test]
    fn uses_most_recent_support_style() {
        let profile = Profile::from_evidence(&[
            evidence(SignalCategory::SupportStyle, "practical", "2026-01-01T00:00:00.000Z"),
            evidence(SignalCategory::SupportStyle, "emotional", "2026-01-02T00:00:00.000Z"),
        ]);
        let guidance = style_guidance(&profile, None);
        assert!(guidance.contains("emotional support"));
        assert!(!guidance.contains("practical"));
    }

    #[test]
    fn intent_alone_is_enough() {
        let rows = [evidence(
            SignalCategory::ImmediateIntent,
            "vent",
            "2026-01-01T00:00:00.000Z",
        )];
        let profile = Profile::from_evidence(&rows);
        let guidance = style_guidance(&profile, current_intent(&rows, "c1"));
        assert!(guidance.contains("want: vent"));
        assert!(!guidance.contains("Be adaptive"));
    }

    #[test]
    fn intent_comes_from_the_current_conversation_only() {
        let intent = SignalCategory::ImmediateIntent;
        let rows = [
            evidence_in("c1", intent, "vent", "2026-01-01T00:00:00.000Z"),
            evidence_in("c1", intent, "plan", "2026-01-01T00:05:00.000Z"),
            evidence_in("c2", intent, "decide", "2026-01-03T00:00:00.000Z"),
        ];
        assert_eq!(current_intent(&rows, "c1").map(|e| e.label.as_str()), Some("plan"));
        assert_eq!(current_intent(&rows, "c2").map(|e| e.label.as_str()), Some("decide"));
        assert!(current_intent(&rows, "c3").is_none());
    }
}
