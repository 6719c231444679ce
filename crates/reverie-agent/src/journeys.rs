// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journey registry populated from `[[journeys]]` configuration entries.

use reverie_config::model::JourneyConfig;
use reverie_core::{Journey, JourneyRegistry};

/// Immutable journey lookup built once at startup. Keeps configuration order.
#[derive(Debug, Clone, Default)]
pub struct StaticJourneyRegistry {
    journeys: Vec<Journey>,
}

impl StaticJourneyRegistry {
    pub fn from_config(entries: &[JourneyConfig]) -> Self {
        let journeys = entries
            .iter()
            .map(|entry| Journey {
                id: entry.id.clone(),
                title: entry.title.clone(),
                description: entry.description.clone(),
                system_prompt: entry.system_prompt.clone(),
            })
            .collect();
        Self { journeys }
    }
}

impl JourneyRegistry for StaticJourneyRegistry {
    fn get(&self, id: &str) -> Option<Journey> {
        self.journeys.iter().find(|j| j.id == id).cloned()
    }

    fn list(&self) -> Vec<Journey> {
        self.journeys.clone()
    }
}
