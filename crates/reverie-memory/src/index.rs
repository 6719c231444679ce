// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector similarity index stored in SQLite.
//!
//! Vectors are kept as little-endian f32 BLOBs in the `vector_entries` table,
//! keyed by `(collection, id)`. Search is a brute-force cosine scan over one
//! collection, which is plenty for a single user's journal.

use async_trait::async_trait;
use reverie_core::{ReverieError, SimilarityIndex, SimilarityRecord};
use reverie_storage::{Database, map_tr_err};
use rusqlite::params;

/// [`SimilarityIndex`] over the shared SQLite connection.
#[derive(Clone)]
pub struct SqliteSimilarityIndex {
    db: Database,
    dimension: usize,
}

impl SqliteSimilarityIndex {
    pub fn new(db: Database, dimension: usize) -> Self {
        Self { db, dimension }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), ReverieError> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(ReverieError::Validation(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )))
        }
    }
}

#[async_trait]
impl SimilarityIndex for SqliteSimilarityIndex {
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector: &[f32],
        metadata: serde_json::Value,
    ) -> Result<(), ReverieError> {
        self.check_dimension(vector)?;
        let collection = collection.to_string();
        let id = id.to_string();
        let blob = vec_to_blob(vector);
        let metadata = metadata.to_string();

        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO vector_entries (collection, id, vector, metadata) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(collection, id) DO UPDATE SET vector = excluded.vector, metadata = excluded.metadata",
                    params![collection, id, blob, metadata],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarityRecord>, ReverieError> {
        self.check_dimension(vector)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let collection = collection.to_string();

        let rows = self
            .db
            .connection()
            .call(move |conn| -> Result<Vec<(String, Vec<u8>, String)>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, vector, metadata FROM vector_entries WHERE collection = ?1",
                )?;
                let rows = stmt
                    .query_map(params![collection], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        let mut records: Vec<SimilarityRecord> = rows
            .into_iter()
            .filter_map(|(id, blob, metadata)| {
                let stored = blob_to_vec(&blob);
                if stored.len() != vector.len() {
                    return None;
                }
                Some(SimilarityRecord {
                    id,
                    score: cosine_similarity(vector, &stored),
                    metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
                })
            })
            .collect();

        records.sort_by(|a, b| b.score.total_cmp(&a.score));
        records.truncate(limit);
        Ok(records)
    }

    async fn remove(&self, collection: &str, ids: &[String]) -> Result<(), ReverieError> {
        if ids.is_empty() {
            return Ok(());
        }
        let collection = collection.to_string();
        let ids = ids.to_vec();

        self.db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt =
                        tx.prepare("DELETE FROM vector_entries WHERE collection = ?1 AND id = ?2")?;
                    for id in &ids {
                        stmt.execute(params![collection, id])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert an f32 vector to bytes for BLOB storage.
pub fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a BLOB back into an f32 vector. Trailing partial values are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity of two equal-length vectors. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
