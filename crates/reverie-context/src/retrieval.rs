// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic retrieval of prior messages and narrative insights.

use std::collections::HashSet;
use std::sync::Arc;

use reverie_config::model::ContextConfig;
use reverie_core::traits::similarity::{INSIGHTS_COLLECTION, MESSAGES_COLLECTION};
use reverie_core::{EmbedKind, EmbeddingAdapter, ReverieError, SimilarityIndex, SimilarityRecord};
use tracing::{debug, warn};

/// Retrieved snippets, best match first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieved {
    pub messages: Vec<String>,
    pub insights: Vec<String>,
}

impl Retrieved {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.insights.is_empty()
    }
}

/// Embeds the current message as a query and searches both collections.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingAdapter>,
    index: Arc<dyn SimilarityIndex>,
    limit: usize,
    threshold: f32,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingAdapter>,
        index: Arc<dyn SimilarityIndex>,
        config: &ContextConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            limit: config.retrieval_limit,
            threshold: config.similarity_threshold,
        }
    }

    /// Never fails: an unready embedder skips retrieval and errors are logged.
    ///
    /// Message ids in `exclude` (the current message and its history window)
    /// are filtered out so retrieval only adds content the prompt lacks.
    pub async fn retrieve(&self, text: &str, exclude: &HashSet<String>) -> Retrieved {
        if self.limit == 0 {
            return Retrieved::default();
        }
        if !self.embedder.is_ready() {
            debug!("embedder not ready, skipping retrieval");
            return Retrieved::default();
        }

        match self.search(text, exclude).await {
            Ok(retrieved) => {
                debug!(
                    messages = retrieved.messages.len(),
                    insights = retrieved.insights.len(),
                    "retrieval complete"
                );
                retrieved
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed, continuing without related content");
                Retrieved::default()
            }
        }
    }

    async fn search(
        &self,
        text: &str,
        exclude: &HashSet<String>,
    ) -> Result<Retrieved, ReverieError> {
        let vector = self.embedder.embed(text, EmbedKind::Query).await?;

        // Over-fetch so excluded ids do not starve the result.
        let fetch = self.limit + exclude.len();
        let messages = self
            .index
            .search(MESSAGES_COLLECTION, &vector, fetch)
            .await?;
        let insights = self
            .index
            .search(INSIGHTS_COLLECTION, &vector, self.limit)
            .await?;

        Ok(Retrieved {
            messages: self.keep(messages, exclude),
            insights: self.keep(insights, exclude),
        })
    }

    fn keep(&self, records: Vec<SimilarityRecord>, exclude: &HashSet<String>) -> Vec<String> {
        records
            .into_iter()
            .filter(|r| r.score >= self.threshold && !exclude.contains(&r.id))
            .filter_map(|r| {
                r.metadata
                    .get("content")
                    .and_then(|c| c.as_str())
                    .map(str::to_string)
            })
            .filter(|content| !content.trim().is_empty())
            .take(self.limit)
            .collect()
    }
}
