//! The search request state machine:
//! `EmbedAndClassify → Search → Rerank → Assemble → Done`, or `Failed` when
//! the retrieval backend cannot produce a result set.
//!
//! Every external adapter is optional. An unconfigured, failing or slow
//! adapter yields its fallback value and the request carries on.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{SearchError, SearchResult};
use crate::models::{
    HitsEnvelope, PhaseTimings, ResponseHit, SearchMetadata, SearchRequest, SearchResponse,
    TotalHits,
};
use crate::pipeline::{intent_applicable, Pipeline, SearchContext};
use crate::search::cursor::page_after;
use crate::search::snippet::{relevant_text, strip_source};
use crate::search::{
    build_clauses, combine, execute_batch, top_hit_trace, ClauseInputs, CombinedHit, Cursor,
    GeoFilter, GeoPoint, GeoScorer, KeywordVariants, SearchBackend, SearchFilters,
    TaxonomyFilter,
};
use crate::upstream::{
    classify_with_fallback, embed_with_fallback, rerank_with_fallback, Embedder,
    IntentClassifier, IntentOutcome, RerankDocument, Reranker,
};
use crate::weights::{resolve_request_weights, WeightStore};

/// Number of hits described in `sources_of_top_hits`.
const TOP_HITS_TRACE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    EmbedAndClassify,
    Search,
    Rerank,
    Assemble,
    Done,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Resource index name prefix; the language code is appended.
    pub index_prefix: String,
    /// Hits fetched per clause before combination and pagination.
    pub candidate_pool: usize,
    pub embed_timeout: Duration,
    pub classify_timeout: Duration,
    pub rerank_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            index_prefix: "resources".to_string(),
            candidate_pool: 300,
            embed_timeout: Duration::from_secs(5),
            classify_timeout: Duration::from_secs(5),
            rerank_timeout: Duration::from_secs(5),
        }
    }
}

/// Tracks the current phase and how long each one took.
struct PhaseTracker {
    phase: Phase,
    started: Instant,
    phase_started: Instant,
    timings: PhaseTimings,
}

impl PhaseTracker {
    fn start() -> Self {
        let now = Instant::now();
        Self {
            phase: Phase::EmbedAndClassify,
            started: now,
            phase_started: now,
            timings: PhaseTimings::default(),
        }
    }

    fn advance(&mut self, next: Phase) {
        let elapsed = millis(self.phase_started.elapsed());
        match self.phase {
            Phase::EmbedAndClassify => self.timings.embed_and_classify_ms = elapsed,
            Phase::Search => self.timings.search_ms = elapsed,
            Phase::Rerank => self.timings.rerank_ms = elapsed,
            Phase::Assemble => self.timings.assemble_ms = elapsed,
            Phase::Done | Phase::Failed(_) => {}
        }
        tracing::debug!(from = ?self.phase, to = ?next, elapsed_ms = elapsed, "phase transition");
        self.phase = next;
        self.phase_started = Instant::now();
        self.timings.total_ms = millis(self.started.elapsed());
    }

    fn fail(&mut self, reason: String) {
        tracing::warn!(phase = ?self.phase, "search failed: {reason}");
        self.advance(Phase::Failed(reason));
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

pub struct Orchestrator {
    weights: Arc<WeightStore>,
    pipeline: Arc<Pipeline>,
    backend: Arc<dyn SearchBackend>,
    embedder: Option<Arc<dyn Embedder>>,
    classifier: Option<Arc<dyn IntentClassifier>>,
    reranker: Option<Arc<dyn Reranker>>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        weights: Arc<WeightStore>,
        pipeline: Arc<Pipeline>,
        backend: Arc<dyn SearchBackend>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            weights,
            pipeline,
            backend,
            embedder: None,
            classifier: None,
            reranker: None,
            settings,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run one search request end to end.
    pub async fn search(&self, req: SearchRequest) -> SearchResult<SearchResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("search", %request_id);
        self.run(req, request_id).instrument(span).await
    }

    async fn run(&self, req: SearchRequest, request_id: Uuid) -> SearchResult<SearchResponse> {
        let mut tracker = PhaseTracker::start();

        // ─── Validation ──────────────────────────────────────
        let limit = req.effective_limit();
        let index = index_name(&self.settings.index_prefix, &req.lang)?;
        let (filters, origin) = build_filters(&req)?;
        let cursor = req
            .search_after
            .as_ref()
            .map(Cursor::from_json)
            .transpose()
            .map_err(SearchError::Validation)?;

        let snapshot = self.weights.snapshot();
        let weights = resolve_request_weights(
            &snapshot,
            &req.legacy_weights,
            req.custom_weights.as_ref(),
        )
        .map_err(|e| SearchError::invalid_weights(&e))?;
        let fingerprint = weights.fingerprint();
        if let Some(fp) = cursor.as_ref().and_then(|c| c.fingerprint.as_deref()) {
            if fp != fingerprint {
                return Err(SearchError::validation(
                    "search_after was issued under different weights; restart pagination",
                ));
            }
        }

        let text = req.text_query();
        let context = match text {
            Some(q) => Some(self.pipeline.analyze_for_search(q).await),
            None => None,
        };
        let is_code_search = context.as_ref().is_some_and(|c| c.is_code_search);
        let keywords = context.as_ref().map(|c| self.keyword_variants(c));
        let search_mode = match (text, req.keyword_search_only) {
            (None, _) => "browse",
            (Some(_), true) => "keyword",
            (Some(_), false) => "hybrid",
        };
        tracing::info!(mode = search_mode, query = text.unwrap_or(""), "search started");

        // ─── Phase 1: embed + classify ───────────────────────
        let want_embedding = text.is_some() && !is_code_search && !req.keyword_search_only;
        let want_intent = !req.keyword_search_only
            && text.is_some_and(|q| {
                intent_applicable(is_code_search, req.disable_intent_classification, q)
            });

        let embed = async {
            match (&self.embedder, text) {
                (Some(embedder), Some(q)) if want_embedding => {
                    embed_with_fallback(embedder.as_ref(), q, self.settings.embed_timeout).await
                }
                _ => None,
            }
        };
        let classify = async {
            match (&self.classifier, text) {
                (Some(classifier), Some(q)) if want_intent => Some(
                    classify_with_fallback(classifier.as_ref(), q, self.settings.classify_timeout)
                        .await,
                ),
                _ => None,
            }
        };
        let (embedding, intent): (Option<Vec<f32>>, Option<IntentOutcome>) =
            tokio::join!(embed, classify);
        tracker.advance(Phase::Search);

        // ─── Phase 2: multi-strategy search ──────────────────
        let intent_codes = intent
            .as_ref()
            .filter(|o| o.supports_intent_search())
            .map(|o| o.classification.combined_taxonomy_codes.as_slice());
        let clauses = build_clauses(
            &ClauseInputs {
                keywords: keywords.as_ref(),
                is_code_search,
                embedding: embedding.as_deref(),
                intent_codes,
                filters: &filters,
                size: self.settings.candidate_pool,
            },
            &weights,
        );

        let results = match execute_batch(self.backend.as_ref(), &index, &clauses).await {
            Ok(results) => results,
            Err(e) => {
                let reason = format!("{e:#}");
                tracker.fail(reason.clone());
                return Err(SearchError::Backend(reason));
            }
        };
        for r in &results {
            tracker
                .timings
                .strategies
                .insert(r.strategy.clone(), r.took_ms);
        }
        let timed_out = results.iter().any(|r| r.timed_out);
        let truncated = results.iter().any(|r| r.total > r.hits.len() as u64);

        let geo = origin.map(|o| GeoScorer::new(o, &weights.geospatial));
        let pool = combine(&results, geo.as_ref());
        let remaining = page_after(&pool, cursor.as_ref());
        let mut page: Vec<CombinedHit> = remaining.iter().take(limit).cloned().collect();
        let next_cursor = (remaining.len() > limit)
            .then(|| page.last().map(|h| Cursor::for_hit(h, &fingerprint).to_json()))
            .flatten();
        let sources_of_top_hits = top_hit_trace(&page, TOP_HITS_TRACE);
        tracker.advance(Phase::Rerank);

        // ─── Phase 3: rerank ─────────────────────────────────
        if let (Some(reranker), Some(q)) = (&self.reranker, text) {
            if page.len() > 1 {
                page = self.rerank_page(reranker.as_ref(), q, page).await;
            }
        }
        tracker.advance(Phase::Assemble);

        // ─── Phase 4: assemble ───────────────────────────────
        let terms = keywords
            .as_ref()
            .map(KeywordVariants::terms)
            .unwrap_or_default();
        let hits: Vec<ResponseHit> = page
            .into_iter()
            .map(|h| {
                let mut source = h.source;
                strip_source(&mut source, req.exclude_service_area);
                let relevant_text = relevant_text(&source, &terms);
                ResponseHit {
                    id: h.doc_id,
                    score: h.total_score,
                    source,
                    sources: h.sources,
                    relevant_text,
                }
            })
            .collect();
        tracker.advance(Phase::Done);

        tracing::info!(
            hits = hits.len(),
            total = pool.len(),
            took_ms = tracker.timings.total_ms,
            "search complete"
        );

        Ok(SearchResponse {
            took: tracker.timings.total_ms,
            timed_out,
            hits: HitsEnvelope {
                total: TotalHits {
                    value: pool.len() as u64,
                    relation: if truncated { "gte" } else { "eq" },
                },
                hits,
            },
            search_after: next_cursor,
            metadata: SearchMetadata {
                request_id,
                search_mode,
                weights_fingerprint: fingerprint,
                intent_classification: intent.map(|o| o.classification),
                granular_phase_timings: tracker.timings,
                sources_of_top_hits,
            },
        })
    }

    /// Lexical variants of an analyzed query. Code searches only ever match
    /// the code as typed.
    fn keyword_variants(&self, context: &SearchContext) -> KeywordVariants {
        let original = context.original_query.clone();
        if context.is_code_search {
            return KeywordVariants {
                original,
                ..Default::default()
            };
        }
        let nouns = self.pipeline.nlp().extract_nouns(&original);
        KeywordVariants {
            nouns: (!nouns.is_empty()).then(|| nouns.join(" ")),
            stemmed_nouns: context.stemmed_query().map(str::to_string),
            original,
        }
    }

    /// Reorder one page with the reranker. The page keeps its membership, so
    /// the cursor computed before reranking stays valid.
    async fn rerank_page(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        page: Vec<CombinedHit>,
    ) -> Vec<CombinedHit> {
        let documents: Vec<RerankDocument> = page
            .iter()
            .map(|h| RerankDocument {
                id: h.doc_id.clone(),
                text: document_text(&h.source),
            })
            .collect();
        let order =
            rerank_with_fallback(reranker, query, &documents, self.settings.rerank_timeout).await;

        let mut by_id: HashMap<String, CombinedHit> =
            page.into_iter().map(|h| (h.doc_id.clone(), h)).collect();
        order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
    }
}

pub(crate) fn index_name(prefix: &str, lang: &str) -> SearchResult<String> {
    let lang = lang.trim().to_lowercase();
    let valid = !lang.is_empty()
        && lang.len() <= 8
        && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(SearchError::validation(format!("unsupported lang '{lang}'")));
    }
    Ok(format!("{prefix}_{lang}"))
}

fn build_filters(req: &SearchRequest) -> SearchResult<(SearchFilters, Option<GeoPoint>)> {
    let origin = match (req.lat, req.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon).map_err(SearchError::Validation)?),
        (None, None) => None,
        _ => {
            return Err(SearchError::validation(
                "lat and lon must be provided together",
            ))
        }
    };
    let geo = match (origin, req.distance) {
        (Some(origin), Some(distance)) => {
            if !distance.is_finite() || distance <= 0.0 {
                return Err(SearchError::validation(format!(
                    "distance must be a positive number of miles, got {distance}"
                )));
            }
            Some(GeoFilter {
                origin,
                distance_miles: distance,
            })
        }
        (None, Some(_)) => {
            return Err(SearchError::validation("distance requires lat and lon"));
        }
        _ => None,
    };
    let taxonomy = req
        .query
        .as_ref()
        .map(|t| TaxonomyFilter {
            and: clean_codes(&t.and),
            or: clean_codes(&t.or),
        })
        .unwrap_or_default();

    Ok((
        SearchFilters {
            geo,
            taxonomy,
            facets: req.facets.clone(),
        },
        origin,
    ))
}

fn clean_codes(codes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if !out.iter().any(|c| c == code) {
            out.push(code.to_string());
        }
    }
    out
}

/// Text the reranker scores: name and description, when present.
fn document_text(source: &Value) -> String {
    ["name", "description"]
        .iter()
        .filter_map(|f| source.get(*f).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(". ")
}
