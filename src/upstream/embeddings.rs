use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Embedder;

/// Maximum characters sent to the embedding service. Queries longer than
/// this are user error or abuse; the tail carries no extra signal.
const MAX_EMBED_CHARS: usize = 2_000;

fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// `POST {url}` with `{"text": ..}`, answered by `{"embedding": [..]}`.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&EmbedRequest {
                text: truncate_for_embedding(text),
            })
            .send()
            .await
            .context("Failed to call embedding service")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Embedding service returned {status}: {body}");
        }

        let body: EmbedResponse = resp
            .json()
            .await
            .context("Failed to parse embedding response")?;
        Ok(body.embedding)
    }
}
