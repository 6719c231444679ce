// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The user profile: a computed view over durable evidence rows.

use std::collections::{BTreeMap, HashSet};

use reverie_core::{Evidence, NarrativeSummary, ProfileTier, SignalCategory};
use serde::Serialize;

/// How many labels per category make it into the prompt summary.
const SUMMARY_LABELS_PER_CATEGORY: usize = 3;

/// Evidence for one label within a category, merged across messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSignal {
    pub label: String,
    pub detail: Option<String>,
    /// Number of evidence rows backing this label.
    pub occurrences: u32,
    /// Highest confidence seen for this label.
    pub confidence: f64,
    /// Quote from the most recent supporting evidence.
    pub quote: String,
    pub last_seen: String,
}

/// Aggregated profile, grouped by tier then category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub tiers: BTreeMap<ProfileTier, BTreeMap<SignalCategory, Vec<ProfileSignal>>>,
    pub evidence_count: usize,
}

impl Profile {
    /// Builds the profile from evidence rows in creation order.
    pub fn from_evidence(evidence: &[Evidence]) -> Self {
        let mut tiers: BTreeMap<ProfileTier, BTreeMap<SignalCategory, Vec<ProfileSignal>>> =
            BTreeMap::new();

        for row in evidence {
            let signals = tiers
                .entry(row.category.tier())
                .or_default()
                .entry(row.category)
                .or_default();
            let key = row.label.trim().to_lowercase();
            match signals.iter_mut().find(|s| s.label.to_lowercase() == key) {
                Some(signal) => {
                    signal.occurrences += 1;
                    signal.confidence = signal.confidence.max(row.confidence);
                    if row.created_at >= signal.last_seen {
                        signal.quote = row.quote.clone();
                        signal.last_seen = row.created_at.clone();
                        if row.detail.is_some() {
                            signal.detail = row.detail.clone();
                        }
                    }
                }
                None => signals.push(ProfileSignal {
                    label: row.label.trim().to_string(),
                    detail: row.detail.clone(),
                    occurrences: 1,
                    confidence: row.confidence,
                    quote: row.quote.clone(),
                    last_seen: row.created_at.clone(),
                }),
            }
        }

        for categories in tiers.values_mut() {
            for signals in categories.values_mut() {
                signals.sort_by(|a, b| {
                    b.occurrences
                        .cmp(&a.occurrences)
                        .then(b.confidence.total_cmp(&a.confidence))
                        .then(b.last_seen.cmp(&a.last_seen))
                });
            }
        }

        Self {
            tiers,
            evidence_count: evidence.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.evidence_count == 0
    }

    /// Signals of one category, strongest first.
    pub fn signals(&self, category: SignalCategory) -> &[ProfileSignal] {
        self.tiers
            .get(&category.tier())
            .and_then(|categories| categories.get(&category))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The most recently observed signal of a category.
    pub fn latest(&self, category: SignalCategory) -> Option<&ProfileSignal> {
        self.signals(category)
            .iter()
            .max_by(|a, b| a.last_seen.cmp(&b.last_seen))
    }

    /// True once enough is known to personalise without guidance: two distinct
    /// values, a goal or challenge, a need state, an emotional tone and a
    /// support-seeking style.
    pub fn baseline_complete(&self) -> bool {
        let distinct_values: HashSet<String> = self
            .signals(SignalCategory::Value)
            .iter()
            .map(|s| s.label.to_lowercase())
            .collect();

        distinct_values.len() >= 2
            && (!self.signals(SignalCategory::Goal).is_empty()
                || !self.signals(SignalCategory::Challenge).is_empty())
            && !self.signals(SignalCategory::NeedState).is_empty()
            && !self.signals(SignalCategory::EmotionalTone).is_empty()
            && !self.signals(SignalCategory::SupportStyle).is_empty()
    }

    /// Plain-text rendering used inside prompts. Empty when nothing is known.
    pub fn summary_text(&self, narrative: Option<&NarrativeSummary>) -> String {
        let mut out = String::new();

        if let Some(narrative) = narrative.filter(|n| !n.identity_summary.trim().is_empty()) {
            out.push_str(&narrative.identity_summary);
            out.push('\n');
            if !narrative.current_phase.is_empty() {
                out.push_str(&format!("Current phase: {}\n", narrative.current_phase));
            }
            if !narrative.emotional_baseline.is_empty() {
                out.push_str(&format!(
                    "Emotional baseline: {}\n",
                    narrative.emotional_baseline
                ));
            }
            push_list(&mut out, "Primary concerns", &narrative.primary_concerns);
            push_list(&mut out, "Patterns to watch", &narrative.patterns_to_watch);
            push_list(&mut out, "Recent wins", &narrative.recent_wins);
            push_list(&mut out, "Recent struggles", &narrative.recent_struggles);
        }

        for (tier, categories) in &self.tiers {
            let lines: Vec<String> = categories
                .iter()
                .filter(|(category, _)| **category != SignalCategory::Quote)
                .map(|(category, signals)| {
                    let labels: Vec<&str> = signals
                        .iter()
                        .take(SUMMARY_LABELS_PER_CATEGORY)
                        .map(|s| s.label.as_str())
                        .collect();
                    format!("- {}: {}", category_title(*category), labels.join(", "))
                })
                .collect();
            if lines.is_empty() {
                continue;
            }
            out.push_str(&format!("[{}]\n", tier_title(*tier)));
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
        }

        out.trim_end().to_string()
    }
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if !items.is_empty() {
        out.push_str(&format!("{title}: {}\n", items.join("; ")));
    }
}

fn tier_title(tier: ProfileTier) -> &'static str {
    match tier {
        ProfileTier::Essential => "Essentials",
        ProfileTier::EarlyInference => "Early inferences",
        ProfileTier::Personality => "Personality",
        ProfileTier::DeeperPatterns => "Deeper patterns",
    }
}

fn category_title(category: SignalCategory) -> String {
    let name = category.to_string().replace('_', " ");
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}
