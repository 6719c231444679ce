// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation guided onboarding records.

use reverie_core::ReverieError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::{DeactivationReason, GuidedOnboardingState};

/// Load the onboarding record for a conversation.
pub async fn get_state(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<GuidedOnboardingState>, ReverieError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT conversation_id, is_active, deactivation_reason, updated_at
                 FROM onboarding_state WHERE conversation_id = ?1",
                params![conversation_id],
                |row| {
                    let reason: Option<String> = row.get(2)?;
                    let deactivation_reason = reason
                        .map(|r| r.parse::<DeactivationReason>())
                        .transpose()
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                2,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?;
                    Ok(GuidedOnboardingState {
                        conversation_id: row.get(0)?,
                        is_active: row.get(1)?,
                        deactivation_reason,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace the onboarding record.
pub async fn save_state(db: &Database, state: &GuidedOnboardingState) -> Result<(), ReverieError> {
    let state = state.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO onboarding_state (conversation_id, is_active, deactivation_reason, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(conversation_id) DO UPDATE SET
                    is_active = excluded.is_active,
                    deactivation_reason = excluded.deactivation_reason,
                    updated_at = excluded.updated_at",
                params![
                    state.conversation_id,
                    state.is_active,
                    state.deactivation_reason.map(|r| r.to_string()),
                    state.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
