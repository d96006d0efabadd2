//! Clients for the external AI services: embedding, intent classification
//! and reranking.
//!
//! Each service sits behind a trait so the orchestrator can be exercised
//! with in-process fakes. The `*_with_fallback` helpers apply the per-call
//! timeout and turn any failure into the service's documented degraded value;
//! nothing in this module surfaces an error to the request.

pub mod embeddings;
pub mod intent;
pub mod rerank;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use embeddings::HttpEmbedder;
pub use intent::HttpIntentClassifier;
pub use rerank::HttpReranker;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> anyhow::Result<IntentClassification>;
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score `documents` against `query`, best first. Documents the service
    /// leaves out of its answer are treated as unranked.
    async fn rerank(
        &self,
        query: &str,
        documents: &[RerankDocument],
        top_k: usize,
    ) -> anyhow::Result<Vec<RankedDocument>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    #[serde(default)]
    pub primary_intent: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub combined_taxonomy_codes: Vec<String>,
    #[serde(default)]
    pub is_low_information_query: bool,
    #[serde(default)]
    pub top_intents: Vec<TopIntent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopIntent {
    pub intent: String,
    #[serde(default)]
    pub confidence: f64,
}

impl IntentClassification {
    /// Degraded result used whenever classification is unavailable: no
    /// intent, zero confidence, and not flagged as low-information.
    pub fn fallback() -> Self {
        Self {
            primary_intent: String::new(),
            confidence: 0.0,
            combined_taxonomy_codes: Vec::new(),
            is_low_information_query: false,
            top_intents: Vec::new(),
        }
    }
}

/// Classification plus whether it came from the service or the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentOutcome {
    pub classification: IntentClassification,
    pub succeeded: bool,
}

impl IntentOutcome {
    /// Intent-driven retrieval only runs on a real, informative classification.
    pub fn supports_intent_search(&self) -> bool {
        self.succeeded
            && !self.classification.is_low_information_query
            && !self.classification.combined_taxonomy_codes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankDocument {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedDocument {
    pub id: String,
    pub score: f64,
}

/// Embed `text`, or `None` if the service fails or exceeds `timeout`.
pub async fn embed_with_fallback(
    embedder: &dyn Embedder,
    text: &str,
    timeout: Duration,
) -> Option<Vec<f32>> {
    match tokio::time::timeout(timeout, embedder.embed(text)).await {
        Ok(Ok(vector)) if !vector.is_empty() => Some(vector),
        Ok(Ok(_)) => {
            tracing::warn!("Embedding service returned an empty vector; skipping semantic search");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!("Embedding failed, skipping semantic search: {e:#}");
            None
        }
        Err(_) => {
            tracing::warn!("Embedding timed out after {timeout:?}, skipping semantic search");
            None
        }
    }
}

/// Classify `query`; on failure or timeout return the fallback result.
pub async fn classify_with_fallback(
    classifier: &dyn IntentClassifier,
    query: &str,
    timeout: Duration,
) -> IntentOutcome {
    match tokio::time::timeout(timeout, classifier.classify(query)).await {
        Ok(Ok(classification)) => IntentOutcome {
            classification,
            succeeded: true,
        },
        Ok(Err(e)) => {
            tracing::warn!("Intent classification failed: {e:#}");
            IntentOutcome {
                classification: IntentClassification::fallback(),
                succeeded: false,
            }
        }
        Err(_) => {
            tracing::warn!("Intent classification timed out after {timeout:?}");
            IntentOutcome {
                classification: IntentClassification::fallback(),
                succeeded: false,
            }
        }
    }
}

/// Reorder `ids` using the reranker. Returns `ids` unchanged on any failure.
/// Ids the reranker did not score keep their relative order after the
/// scored ones.
pub async fn rerank_with_fallback(
    reranker: &dyn Reranker,
    query: &str,
    documents: &[RerankDocument],
    timeout: Duration,
) -> Vec<String> {
    let original: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
    if documents.is_empty() {
        return original;
    }

    let ranked = match tokio::time::timeout(
        timeout,
        reranker.rerank(query, documents, documents.len()),
    )
    .await
    {
        Ok(Ok(ranked)) => ranked,
        Ok(Err(e)) => {
            tracing::warn!("Re-ranking failed, keeping combined order: {e:#}");
            return original;
        }
        Err(_) => {
            tracing::warn!("Re-ranking timed out after {timeout:?}, keeping combined order");
            return original;
        }
    };

    let mut ranked: Vec<RankedDocument> = ranked
        .into_iter()
        .filter(|r| original.contains(&r.id))
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut order: Vec<String> = Vec::with_capacity(original.len());
    for r in ranked {
        if !order.contains(&r.id) {
            order.push(r.id);
        }
    }
    for id in original {
        if !order.contains(&id) {
            order.push(id);
        }
    }
    order
}
