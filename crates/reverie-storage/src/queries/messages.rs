// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.
//!
//! Messages are ordered by `created_at` with ties broken by insertion order
//! (`rowid`).

use reverie_core::ReverieError;
use rusqlite::{OptionalExtension, Transaction, params};

use crate::database::Database;
use crate::models::{MESSAGE_COLUMNS, Message, Role, message_from_row};

/// Insert a message and refresh the owning conversation's `updated_at`.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), ReverieError> {
    let msg = msg.clone();
    let conversation_id = msg.conversation_id.clone();
    let touched = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let touched = tx.execute(
                "UPDATE conversations SET updated_at = MAX(updated_at, ?1) WHERE id = ?2",
                params![msg.created_at, msg.conversation_id],
            )?;
            if touched == 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO messages (id, conversation_id, role, content, prompt, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.role.to_string(),
                    msg.content,
                    msg.prompt,
                    msg.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if !touched {
        return Err(ReverieError::not_found("conversation", &conversation_id));
    }
    Ok(())
}

/// Get a message by ID.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, ReverieError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All messages of a conversation in chronological order.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, ReverieError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], message_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Up to `limit` messages immediately preceding `message_id`, oldest first.
pub async fn messages_before(
    db: &Database,
    message_id: &str,
    limit: usize,
) -> Result<Vec<Message>, ReverieError> {
    let message_id = message_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m
                 WHERE m.conversation_id = (SELECT conversation_id FROM messages WHERE id = ?1)
                   AND (m.created_at, m.rowid) < (
                        SELECT created_at, rowid FROM messages WHERE id = ?1)
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![message_id, limit], message_from_row)?;
            let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count messages, optionally filtered by conversation and role.
pub async fn count_messages(
    db: &Database,
    conversation_id: Option<&str>,
    role: Option<Role>,
) -> Result<i64, ReverieError> {
    let conversation_id = conversation_id.map(str::to_string);
    let role = role.map(|r| r.to_string());
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE (?1 IS NULL OR conversation_id = ?1)
                   AND (?2 IS NULL OR role = ?2)",
                params![conversation_id, role],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Removes messages and their extractions and evidence inside `tx`.
fn delete_with_dependents(tx: &Transaction<'_>, ids: &[String]) -> rusqlite::Result<()> {
    for id in ids {
        tx.execute("DELETE FROM evidence WHERE message_id = ?1", params![id])?;
        tx.execute("DELETE FROM extractions WHERE message_id = ?1", params![id])?;
        tx.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
    }
    Ok(())
}

/// Delete one message with its dependents. Returns `false` if it did not exist.
pub async fn delete_message(db: &Database, id: &str) -> Result<bool, ReverieError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(false);
            }
            delete_with_dependents(&tx, std::slice::from_ref(&id))?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every message of `conversation_id` whose `created_at` is strictly
/// later than that of `message_id`, with dependents. Messages sharing the
/// anchor timestamp are kept. Returns the removed IDs in chronological order.
pub async fn delete_messages_after(
    db: &Database,
    conversation_id: &str,
    message_id: &str,
) -> Result<Vec<String>, ReverieError> {
    let conversation_id_owned = conversation_id.to_string();
    let message_id_owned = message_id.to_string();
    let removed = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let anchor: Option<String> = tx
                .query_row(
                    "SELECT created_at FROM messages WHERE id = ?1 AND conversation_id = ?2",
                    params![message_id_owned, conversation_id_owned],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(created_at) = anchor else {
                return Ok(None);
            };
            let ids = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM messages
                     WHERE conversation_id = ?1 AND created_at > ?2
                     ORDER BY created_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(
                    params![conversation_id_owned, created_at],
                    |row| row.get::<_, String>(0),
                )?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            delete_with_dependents(&tx, &ids)?;
            tx.commit()?;
            Ok(Some(ids))
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    removed.ok_or_else(|| ReverieError::not_found("message", message_id))
}
