//! Reranker client.
//!
//! Sends one batch request with every candidate instead of scoring documents
//! individually. The service is expected to answer with a relevance score per
//! id; ordering is decided locally.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{RankedDocument, RerankDocument, Reranker};

/// Upper bound on document text sent per candidate.
const MAX_DOC_CHARS: usize = 1_000;

pub struct HttpReranker {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpReranker {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: timeout.min(Duration::from_secs(30)),
        }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: Vec<RerankDocument>,
    top_k: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    ranked_results: Vec<RankedDocument>,
}

fn truncate_content(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[RerankDocument],
        top_k: usize,
    ) -> Result<Vec<RankedDocument>> {
        let req_body = RerankRequest {
            query,
            documents: documents
                .iter()
                .map(|d| RerankDocument {
                    id: d.id.clone(),
                    text: truncate_content(&d.text, MAX_DOC_CHARS),
                })
                .collect(),
            top_k,
        };

        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&req_body)
            .send()
            .await
            .context("Failed to reach reranker endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Reranker returned {status}: {body}");
        }

        let body: RerankResponse = resp
            .json()
            .await
            .context("Failed to parse reranker response")?;
        Ok(body.ranked_results)
    }
}
