// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guided onboarding state machine.
//!
//! A conversation started from a journey begins in the active state and stays
//! there until the extraction pipeline detects a complete baseline profile.
//! Once inactive the state is terminal: there is no transition back.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Why guided onboarding ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeactivationReason {
    BaselineMet,
}

/// Per-conversation onboarding record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidedOnboardingState {
    pub conversation_id: String,
    pub is_active: bool,
    pub deactivation_reason: Option<DeactivationReason>,
    pub updated_at: String,
}

impl GuidedOnboardingState {
    /// Initial state for a freshly created conversation.
    pub fn initial(conversation_id: &str, journey_started: bool, now: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            is_active: journey_started,
            deactivation_reason: None,
            updated_at: now.to_string(),
        }
    }

    /// Moves an active state to inactive.
    ///
    /// Returns `true` when a transition happened. Calling this on an already
    /// inactive state is a no-op and keeps the original reason.
    pub fn deactivate(&mut self, reason: DeactivationReason, now: &str) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.deactivation_reason = Some(reason);
        self.updated_at = now.to_string();
        true
    }
}
