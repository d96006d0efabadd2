use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::MAX_CANDIDATE_POOL;
use crate::pipeline::SearchContext;
use crate::search::{SourceContribution, TopHitTrace};
use crate::upstream::IntentClassification;
use crate::weights::{LegacyWeights, WeightConfig, WeightOverrides};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;
pub const SUGGEST_PAGE_SIZE: usize = 10;
/// Deepest suggestion page; keeps the fetch window within the candidate pool.
pub const MAX_SUGGEST_PAGE: usize = MAX_CANDIDATE_POOL / SUGGEST_PAGE_SIZE;

// ─── Search ──────────────────────────────────────────────

/// Search request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    /// Free-text query. Absent or blank means browse mode.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Cursor from the previous page's `search_after`.
    #[serde(default)]
    pub search_after: Option<Value>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Radius in miles.
    pub distance: Option<f64>,
    /// Taxonomy filter
    #[serde(default)]
    pub query: Option<TaxonomyQuery>,
    #[serde(default)]
    pub facets: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub keyword_search_only: bool,
    #[serde(default)]
    pub disable_intent_classification: bool,
    #[serde(default)]
    pub exclude_service_area: bool,
    #[serde(default)]
    pub custom_weights: Option<WeightOverrides>,
    #[serde(flatten)]
    pub legacy_weights: LegacyWeights,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonomyQuery {
    #[serde(rename = "AND", default)]
    pub and: Vec<String>,
    #[serde(rename = "OR", default)]
    pub or: Vec<String>,
}

impl SearchRequest {
    /// Requested page size, defaulted and clamped to `1..=MAX_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Trimmed free-text query, or `None` in browse mode.
    pub fn text_query(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_page() -> usize {
    1
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub took: u64,
    pub timed_out: bool,
    pub hits: HitsEnvelope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Value>,
    pub metadata: SearchMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct HitsEnvelope {
    pub total: TotalHits,
    pub hits: Vec<ResponseHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalHits {
    pub value: u64,
    /// `"eq"` or `"gte"`
    pub relation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: f64,
    #[serde(rename = "_source")]
    pub source: Value,
    #[serde(rename = "_sources", skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceContribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub request_id: Uuid,
    /// `hybrid`, `keyword` or `browse`
    pub search_mode: &'static str,
    pub weights_fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_classification: Option<IntentClassification>,
    pub granular_phase_timings: PhaseTimings,
    pub sources_of_top_hits: Vec<TopHitTrace>,
}

/// Wall-clock time per orchestrator phase, plus each strategy's own
/// backend-reported execution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseTimings {
    pub embed_and_classify_ms: u64,
    pub search_ms: u64,
    pub rerank_ms: u64,
    pub assemble_ms: u64,
    pub total_ms: u64,
    pub strategies: BTreeMap<String, u64>,
}

// ─── Suggestions ─────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub disable_intent_classification: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestResponse {
    pub took: u64,
    pub page: usize,
    pub total: u64,
    pub suggestions: Vec<Suggestion>,
    /// How the query was interpreted.
    pub context: SearchContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceContribution>,
}

// ─── Service endpoints ───────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub weights_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightsResponse {
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub weights: WeightConfig,
}
