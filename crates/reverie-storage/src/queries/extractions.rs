// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction lifecycle and evidence rows.
//!
//! Every write first checks that the owning message (or extraction) still
//! exists inside the same transaction. A message deleted while its
//! extraction was in flight turns the write into a no-op reported as `false`.

use reverie_core::ReverieError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Evidence, Extraction, ExtractionStatus, parse_column};

fn extraction_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Extraction> {
    Ok(Extraction {
        id: row.get(0)?,
        message_id: row.get(1)?,
        conversation_id: row.get(2)?,
        payload: row.get(3)?,
        status: parse_column(row, 4)?,
        error: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn evidence_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Evidence> {
    Ok(Evidence {
        id: row.get(0)?,
        extraction_id: row.get(1)?,
        message_id: row.get(2)?,
        conversation_id: row.get(3)?,
        category: parse_column(row, 4)?,
        label: row.get(5)?,
        detail: row.get(6)?,
        confidence: row.get(7)?,
        quote: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Record a pending extraction if its message still exists.
pub async fn insert_extraction(
    db: &Database,
    extraction: &Extraction,
) -> Result<bool, ReverieError> {
    let extraction = extraction.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1)",
                params![extraction.message_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO extractions (id, message_id, conversation_id, payload, status, error, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    extraction.id,
                    extraction.message_id,
                    extraction.conversation_id,
                    extraction.payload,
                    extraction.status.to_string(),
                    extraction.error,
                    extraction.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append evidence rows and mark the extraction validated, atomically.
pub async fn validate_extraction(
    db: &Database,
    extraction_id: &str,
    payload: &str,
    evidence: &[Evidence],
) -> Result<bool, ReverieError> {
    let extraction_id = extraction_id.to_string();
    let payload = payload.to_string();
    let evidence = evidence.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE extractions SET status = ?1, payload = ?2, error = NULL
                 WHERE id = ?3
                   AND EXISTS(SELECT 1 FROM messages WHERE id = extractions.message_id)",
                params![ExtractionStatus::Validated.to_string(), payload, extraction_id],
            )?;
            if updated == 0 {
                return Ok(false);
            }
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO evidence (id, extraction_id, message_id, conversation_id, category,
                                           label, detail, confidence, quote, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )?;
                for row in &evidence {
                    stmt.execute(params![
                        row.id,
                        row.extraction_id,
                        row.message_id,
                        row.conversation_id,
                        row.category.to_string(),
                        row.label,
                        row.detail,
                        row.confidence,
                        row.quote,
                        row.created_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark an extraction rejected. Returns `false` if it no longer exists.
pub async fn reject_extraction(
    db: &Database,
    extraction_id: &str,
    payload: Option<&str>,
    reason: &str,
) -> Result<bool, ReverieError> {
    let extraction_id = extraction_id.to_string();
    let payload = payload.map(str::to_string);
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE extractions SET status = ?1, payload = COALESCE(?2, payload), error = ?3
                 WHERE id = ?4",
                params![ExtractionStatus::Rejected.to_string(), payload, reason, extraction_id],
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Extractions recorded for a message, oldest first.
pub async fn get_extractions(
    db: &Database,
    message_id: &str,
) -> Result<Vec<Extraction>, ReverieError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, message_id, conversation_id, payload, status, error, created_at
                 FROM extractions WHERE message_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![message_id], extraction_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every extraction and evidence row of a conversation.
pub async fn delete_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<usize, ReverieError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM evidence WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            let removed = tx.execute(
                "DELETE FROM extractions WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Evidence rows in creation order, optionally for one conversation.
pub async fn list_evidence(
    db: &Database,
    conversation_id: Option<&str>,
) -> Result<Vec<Evidence>, ReverieError> {
    let conversation_id = conversation_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, extraction_id, message_id, conversation_id, category, label, detail,
                        confidence, quote, created_at
                 FROM evidence WHERE (?1 IS NULL OR conversation_id = ?1)
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], evidence_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
