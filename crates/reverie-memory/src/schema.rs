// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The structured signal payload requested from the model, and its validation.
//!
//! Every signal must carry a non-empty label, a confidence in `[0, 1]` and a
//! verbatim quote. A malformed signal rejects the whole payload. A signal whose
//! quote cannot be found in the source message is dropped on its own.

use reverie_core::{ReverieError, SignalCategory};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Confidence assumed when the model omits one.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// One signal instance as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub quote: String,
}

/// Full extraction payload. Unknown keys are ignored; missing keys mean no
/// signals of that kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPayload {
    pub quotes: Vec<Signal>,
    pub values: Vec<Signal>,
    pub challenges: Vec<Signal>,
    pub goals: Vec<Signal>,
    pub need_states: Vec<Signal>,
    pub life_situation: Vec<Signal>,
    pub immediate_intent: Vec<Signal>,
    pub emotional_tone: Vec<Signal>,
    pub moral_foundations: Vec<Signal>,
    pub support_style: Vec<Signal>,
    pub risk_tolerance: Vec<Signal>,
    pub motivation_style: Vec<Signal>,
    pub locus_of_control: Vec<Signal>,
    pub temporal_orientation: Vec<Signal>,
    pub growth_mindset: Vec<Signal>,
    pub personality_traits: Vec<Signal>,
    pub attachment_style: Vec<Signal>,
    pub change_readiness: Vec<Signal>,
    pub stress_response: Vec<Signal>,
    pub emotional_regulation: Vec<Signal>,
    pub self_efficacy: Vec<Signal>,
}

impl ExtractionPayload {
    /// Every signal paired with its category.
    pub fn signals(&self) -> impl Iterator<Item = (SignalCategory, &Signal)> {
        use SignalCategory::*;
        [
            (Quote, &self.quotes),
            (Value, &self.values),
            (Challenge, &self.challenges),
            (Goal, &self.goals),
            (NeedState, &self.need_states),
            (LifeSituation, &self.life_situation),
            (ImmediateIntent, &self.immediate_intent),
            (EmotionalTone, &self.emotional_tone),
            (MoralFoundation, &self.moral_foundations),
            (SupportStyle, &self.support_style),
            (RiskTolerance, &self.risk_tolerance),
            (MotivationStyle, &self.motivation_style),
            (LocusOfControl, &self.locus_of_control),
            (TemporalOrientation, &self.temporal_orientation),
            (GrowthMindset, &self.growth_mindset),
            (PersonalityTrait, &self.personality_traits),
            (AttachmentStyle, &self.attachment_style),
            (ChangeReadiness, &self.change_readiness),
            (StressResponse, &self.stress_response),
            (EmotionalRegulation, &self.emotional_regulation),
            (SelfEfficacy, &self.self_efficacy),
        ]
        .into_iter()
        .flat_map(|(category, signals)| signals.iter().map(move |s| (category, s)))
    }
}

/// A signal that passed validation and is grounded in the source message.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSignal {
    pub category: SignalCategory,
    pub label: String,
    pub detail: Option<String>,
    pub confidence: f64,
    pub quote: String,
}

/// Result of validating a payload against its source message.
#[derive(Debug, Clone, Default)]
pub struct ValidatedPayload {
    pub signals: Vec<ValidatedSignal>,
    /// Signals dropped because their quote does not occur in the message.
    pub unsupported: usize,
}

/// Parses a model response into a payload.
///
/// Tolerates markdown code fences and prose around the JSON object.
pub fn parse_payload(response: &str) -> Result<ExtractionPayload, ReverieError> {
    let json = json_object(response).ok_or_else(|| {
        ReverieError::Validation("response contains no JSON object".into())
    })?;
    serde_json::from_str(json)
        .map_err(|e| ReverieError::Validation(format!("unparseable payload: {e}")))
}

/// Validates every signal and keeps those whose quote occurs in `message`.
pub fn validate_payload(
    payload: &ExtractionPayload,
    message: &str,
) -> Result<ValidatedPayload, ReverieError> {
    let haystack = normalize(message);
    let mut validated = ValidatedPayload::default();

    for (category, signal) in payload.signals() {
        let label = signal.label.trim();
        if label.is_empty() {
            return Err(ReverieError::Validation(format!(
                "{category} signal has an empty label"
            )));
        }
        let quote = signal.quote.trim();
        if quote.is_empty() {
            return Err(ReverieError::Validation(format!(
                "{category} signal `{label}` has no supporting quote"
            )));
        }
        let confidence = signal.confidence.unwrap_or(DEFAULT_CONFIDENCE);
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ReverieError::Validation(format!(
                "{category} signal `{label}` has confidence {confidence} outside [0, 1]"
            )));
        }

        let needle = normalize(strip_quote_marks(quote));
        if needle.is_empty() || !haystack.contains(&needle) {
            debug!(%category, label, "dropping signal with unsupported quote");
            validated.unsupported += 1;
            continue;
        }

        validated.signals.push(ValidatedSignal {
            category,
            label: label.to_string(),
            detail: signal
                .detail
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            confidence,
            quote: quote.to_string(),
        });
    }

    Ok(validated)
}

/// The outermost `{...}` span of a model response.
pub(crate) fn json_object(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
        _ => None,
    }
}

fn strip_quote_marks(quote: &str) -> &str {
    quote.trim_matches(|c: char| {
        matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}')
    })
}

/// Lowercases, unifies apostrophes and collapses whitespace so quotes match
/// across trivial formatting differences.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase().replace(['\u{2018}', '\u{2019}'], "'"))
        .collect::<Vec<_>>()
        .join(" ")
}
