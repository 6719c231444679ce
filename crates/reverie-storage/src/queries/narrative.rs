// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single current narrative summary row.

use reverie_core::ReverieError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::{NarrativeSummary, json_list};

/// Load the current narrative, if one has been generated.
pub async fn get_narrative(db: &Database) -> Result<Option<NarrativeSummary>, ReverieError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT identity_summary, current_phase, emotional_baseline, primary_concerns,
                        patterns_to_watch, recent_wins, recent_struggles, message_count, updated_at
                 FROM narrative WHERE id = 1",
                [],
                |row| {
                    Ok(NarrativeSummary {
                        identity_summary: row.get(0)?,
                        current_phase: row.get(1)?,
                        emotional_baseline: row.get(2)?,
                        primary_concerns: json_list(row, 3)?,
                        patterns_to_watch: json_list(row, 4)?,
                        recent_wins: json_list(row, 5)?,
                        recent_struggles: json_list(row, 6)?,
                        message_count: row.get(7)?,
                        updated_at: row.get(8)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace the current narrative.
pub async fn save_narrative(
    db: &Database,
    narrative: &NarrativeSummary,
) -> Result<(), ReverieError> {
    let encode = |list: &Vec<String>| {
        serde_json::to_string(list).map_err(|e| ReverieError::Storage {
            source: Box::new(e),
        })
    };
    let concerns = encode(&narrative.primary_concerns)?;
    let patterns = encode(&narrative.patterns_to_watch)?;
    let wins = encode(&narrative.recent_wins)?;
    let struggles = encode(&narrative.recent_struggles)?;
    let narrative = narrative.clone();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO narrative (id, identity_summary, current_phase, emotional_baseline,
                                        primary_concerns, patterns_to_watch, recent_wins,
                                        recent_struggles, message_count, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    identity_summary = excluded.identity_summary,
                    current_phase = excluded.current_phase,
                    emotional_baseline = excluded.emotional_baseline,
                    primary_concerns = excluded.primary_concerns,
                    patterns_to_watch = excluded.patterns_to_watch,
                    recent_wins = excluded.recent_wins,
                    recent_struggles = excluded.recent_struggles,
                    message_count = excluded.message_count,
                    updated_at = excluded.updated_at",
                params![
                    narrative.identity_summary,
                    narrative.current_phase,
                    narrative.emotional_baseline,
                    concerns,
                    patterns,
                    wins,
                    struggles,
                    narrative.message_count,
                    narrative.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
