// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only lookup of scripted journeys.

use crate::types::Journey;

/// Static registry of journeys, immutable after startup.
pub trait JourneyRegistry: Send + Sync + 'static {
    fn get(&self, id: &str) -> Option<Journey>;

    fn list(&self) -> Vec<Journey>;
}
