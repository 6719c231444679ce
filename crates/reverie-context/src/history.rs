// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User prompt assembly from the recent history window.

use reverie_core::{Message, Role};

/// Combines prior messages (oldest first) with the current message.
///
/// Without history the user prompt is the current message verbatim.
pub fn user_prompt(history: &[Message], current: &str) -> String {
    if history.is_empty() {
        return current.to_string();
    }

    let mut prompt = String::from("Recent conversation:\n");
    for message in history {
        let speaker = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(&format!("{speaker}: {}\n", message.content));
    }
    prompt.push_str("\nCurrent message:\n");
    prompt.push_str(current);
    prompt
}
