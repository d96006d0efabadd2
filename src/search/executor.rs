use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;

use super::{RawHit, StrategyClause, StrategyResult};

/// One clause's answer inside a multi-search response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseResponse {
    pub took_ms: u64,
    pub total: u64,
    pub timed_out: bool,
    pub hits: Vec<RawHit>,
    pub error: Option<String>,
}

/// A retrieval backend that runs several query bodies in one round trip.
///
/// Implementations return exactly one response per body, in order. An error
/// return means the backend could not be reached at all.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn multi_search(&self, index: &str, bodies: &[Value]) -> Result<Vec<ClauseResponse>>;
}

/// `_msearch` over an OpenSearch (or Elasticsearch) cluster.
pub struct OpenSearchBackend {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl OpenSearchBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    pub fn with_basic_auth(mut self, username: String, password: String) -> Self {
        self.credentials = Some((username, password));
        self
    }
}

/// Newline-delimited header/body pairs, one pair per query.
fn encode_msearch(index: &str, bodies: &[Value]) -> Result<String> {
    let header = serde_json::to_string(&serde_json::json!({ "index": index }))?;
    let mut out = String::new();
    for body in bodies {
        out.push_str(&header);
        out.push('\n');
        out.push_str(&serde_json::to_string(body)?);
        out.push('\n');
    }
    Ok(out)
}

#[derive(Deserialize)]
struct MsearchResponse {
    responses: Vec<MsearchItem>,
}

#[derive(Deserialize)]
struct MsearchItem {
    #[serde(default)]
    took: u64,
    #[serde(default)]
    timed_out: bool,
    hits: Option<MsearchHits>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct MsearchHits {
    total: Option<TotalField>,
    #[serde(default)]
    hits: Vec<MsearchHit>,
}

/// `hits.total` is an object on current clusters and a bare number on old ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum TotalField {
    Object { value: u64 },
    Count(u64),
}

#[derive(Deserialize)]
struct MsearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
}

impl From<MsearchItem> for ClauseResponse {
    fn from(item: MsearchItem) -> Self {
        if let Some(error) = item.error {
            let reason = error
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return ClauseResponse {
                error: Some(reason),
                ..Default::default()
            };
        }
        let hits = item.hits.unwrap_or(MsearchHits {
            total: None,
            hits: Vec::new(),
        });
        let raw: Vec<RawHit> = hits
            .hits
            .into_iter()
            .map(|h| RawHit {
                doc_id: h.id,
                score: h.score.unwrap_or(0.0),
                source: h.source,
            })
            .collect();
        let total = match hits.total {
            Some(TotalField::Object { value }) | Some(TotalField::Count(value)) => value,
            None => raw.len() as u64,
        };
        ClauseResponse {
            took_ms: item.took,
            total,
            timed_out: item.timed_out,
            hits: raw,
            error: None,
        }
    }
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    async fn multi_search(&self, index: &str, bodies: &[Value]) -> Result<Vec<ClauseResponse>> {
        if bodies.is_empty() {
            return Ok(Vec::new());
        }
        let payload = encode_msearch(index, bodies)?;
        let mut request = self
            .client
            .post(format!("{}/_msearch", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload);
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }

        let resp = request
            .send()
            .await
            .context("Failed to reach search backend")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Search backend returned {status}: {body}");
        }

        let parsed: MsearchResponse = resp
            .json()
            .await
            .context("Failed to parse multi-search response")?;
        if parsed.responses.len() != bodies.len() {
            anyhow::bail!(
                "Search backend answered {} of {} queries",
                parsed.responses.len(),
                bodies.len()
            );
        }
        Ok(parsed.responses.into_iter().map(ClauseResponse::from).collect())
    }
}

/// Run every clause in one batched call and label each answer with its
/// strategy and weight.
///
/// A clause the backend rejects degrades to an empty result. The batch fails
/// only when the backend is unreachable or every clause was rejected.
pub async fn execute_batch(
    backend: &dyn SearchBackend,
    index: &str,
    clauses: &[StrategyClause],
) -> Result<Vec<StrategyResult>> {
    if clauses.is_empty() {
        return Ok(Vec::new());
    }
    let bodies: Vec<Value> = clauses.iter().map(|c| c.body.clone()).collect();

    let start = Instant::now();
    let responses = backend.multi_search(index, &bodies).await?;
    tracing::debug!(
        clauses = clauses.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "multi-search complete"
    );

    let results: Vec<StrategyResult> = clauses
        .iter()
        .zip(responses)
        .map(|(clause, resp)| {
            if let Some(err) = &resp.error {
                tracing::warn!("Strategy {} failed, continuing without it: {err}", clause.strategy);
            }
            StrategyResult {
                strategy: clause.strategy.clone(),
                weight: clause.weight,
                took_ms: resp.took_ms,
                total: resp.total,
                timed_out: resp.timed_out,
                hits: resp.hits,
                error: resp.error,
            }
        })
        .collect();

    if results.iter().all(|r| r.error.is_some()) {
        let reasons: Vec<&str> = results.iter().filter_map(|r| r.error.as_deref()).collect();
        anyhow::bail!("every search strategy failed: {}", reasons.join("; "));
    }
    Ok(results)
}
