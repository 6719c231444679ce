// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model re-exports and row conversion helpers.
//!
//! The canonical types live in `reverie-core`; this module maps their enum
//! fields to and from the TEXT columns used by the schema.

use std::str::FromStr;

use rusqlite::types::Type;

pub use reverie_core::onboarding::{DeactivationReason, GuidedOnboardingState};
pub use reverie_core::types::{
    Conversation, Evidence, Extraction, ExtractionStatus, Message, NarrativeSummary, Role,
    SignalCategory,
};

/// Reads a TEXT column and parses it with the type's `FromStr`.
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads a JSON array column into a list of strings.
pub(crate) fn json_list(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: parse_column(row, 2)?,
        content: row.get(3)?,
        prompt: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(crate) const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, prompt, created_at";
