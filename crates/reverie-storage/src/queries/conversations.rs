// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD and the conversation-level delete cascade.

use reverie_core::ReverieError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::{Conversation, GuidedOnboardingState};

const COLUMNS: &str = "id, title, journey_id, created_at, updated_at";

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        journey_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Create a conversation and its onboarding record in one transaction.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
    onboarding: &GuidedOnboardingState,
) -> Result<(), ReverieError> {
    let conversation = conversation.clone();
    let onboarding = onboarding.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (id, title, journey_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    conversation.id,
                    conversation.title,
                    conversation.journey_id,
                    conversation.created_at,
                    conversation.updated_at,
                ],
            )?;
            tx.execute(
                "INSERT INTO onboarding_state (conversation_id, is_active, deactivation_reason, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    onboarding.conversation_id,
                    onboarding.is_active,
                    onboarding.deactivation_reason.map(|r| r.to_string()),
                    onboarding.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, ReverieError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List conversations, most recently updated first.
pub async fn list_conversations(db: &Database) -> Result<Vec<Conversation>, ReverieError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations ORDER BY updated_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map([], conversation_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The most recently updated conversation.
pub async fn latest_conversation(db: &Database) -> Result<Option<Conversation>, ReverieError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM conversations ORDER BY updated_at DESC, rowid DESC LIMIT 1"
                ),
                [],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the title of a conversation.
pub async fn set_title(db: &Database, id: &str, title: &str) -> Result<(), ReverieError> {
    let id_owned = id.to_string();
    let title = title.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET title = ?1 WHERE id = ?2",
                params![title, id_owned],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(ReverieError::not_found("conversation", id));
    }
    Ok(())
}

/// Delete a conversation with its messages, extractions, evidence and
/// onboarding record. Returns the removed message IDs; empty if the
/// conversation did not exist.
pub async fn delete_conversation(db: &Database, id: &str) -> Result<Vec<String>, ReverieError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let message_ids = {
                let mut stmt =
                    tx.prepare("SELECT id FROM messages WHERE conversation_id = ?1")?;
                let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            tx.execute("DELETE FROM evidence WHERE conversation_id = ?1", params![id])?;
            tx.execute("DELETE FROM extractions WHERE conversation_id = ?1", params![id])?;
            tx.execute("DELETE FROM messages WHERE conversation_id = ?1", params![id])?;
            tx.execute(
                "DELETE FROM onboarding_state WHERE conversation_id = ?1",
                params![id],
            )?;
            tx.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(message_ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_conversation(id: &str, updated_at: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: None,
            journey_id: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: updated_at.to_string(),
        }
    }

    pub(crate) async fn insert_conversation(db: &Database, id: &str, updated_at: &str) {
        let conversation = make_conversation(id, updated_at);
        let onboarding = GuidedOnboardingState::initial(id, false, updated_at);
        create_conversation(db, &conversation, &onboarding)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_and_get_conversation() {
        let db = Database::open_in_memory().await.unwrap();
        insert_conversation(&db, "c1", "2026-01-01T00:00:00.000Z").await;

        let found = get_conversation(&db, "c1").await.unwrap().unwrap();
        assert_eq!(found.id, "c1");
        assert!(found.title.is_none());
        assert!(get_conversation(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_by_updated_at_desc() {
        let db = Database::open_in_memory().await.unwrap();
        insert_conversation(&db, "old", "2026-01-01T00:00:00.000Z").await;
        insert_conversation(&db, "new", "2026-01-02T00:00:00.000Z").await;

        let all = list_conversations(&db).await.unwrap();
        assert_eq!(all[0].id, "new");
        assert_eq!(all[1].id, "old");

        let latest = latest_conversation(&db).await.unwrap().unwrap();
        assert_eq!(latest.id, "new");
    }

    #[tokio::test]
    async fn set_title_on_missing_conversation_is_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let err = set_title(&db, "nope", "Title").await.unwrap_err();
        assert!(matches!(err, ReverieError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_missing_conversation_returns_empty() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(delete_conversation(&db, "nope").await.unwrap().is_empty());
    }
}
