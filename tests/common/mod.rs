//! In-process fakes for the retrieval backend and the AI adapters.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use directory_search::nlp::NlpEngine;
use directory_search::orchestrator::{Orchestrator, OrchestratorSettings};
use directory_search::pipeline::{MapSynonyms, Pipeline};
use directory_search::search::executor::ClauseResponse;
use directory_search::search::{RawHit, SearchBackend};
use directory_search::upstream::{
    Embedder, IntentClassification, IntentClassifier, RankedDocument, RerankDocument, Reranker,
    TopIntent,
};
use directory_search::weights::{WeightConfig, WeightStore};

type Responder = Box<dyn Fn(&Value) -> Vec<RawHit> + Send + Sync>;

/// Answers each query body with whatever the responder returns for it and
/// records every call.
pub struct FakeBackend {
    responder: Responder,
    pub calls: Mutex<Vec<(String, Vec<Value>)>>,
    unreachable: bool,
}

impl FakeBackend {
    pub fn new(responder: impl Fn(&Value) -> Vec<RawHit> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            responder: Box::new(|_| Vec::new()),
            calls: Mutex::new(Vec::new()),
            unreachable: true,
        }
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .flat_map(|(_, bodies)| bodies.clone())
            .collect()
    }

    pub fn indexes(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(i, _)| i.clone()).collect()
    }
}

#[async_trait]
impl SearchBackend for FakeBackend {
    async fn multi_search(&self, index: &str, bodies: &[Value]) -> anyhow::Result<Vec<ClauseResponse>> {
        if self.unreachable {
            anyhow::bail!("connection refused");
        }
        self.calls.lock().push((index.to_string(), bodies.to_vec()));
        Ok(bodies
            .iter()
            .map(|body| {
                let hits = (self.responder)(body);
                ClauseResponse {
                    took_ms: 3,
                    total: hits.len() as u64,
                    timed_out: false,
                    hits,
                    error: None,
                }
            })
            .collect())
    }
}

/// What kind of clause a query body is: `knn:<field>`, `match:<text>`,
/// `intent`, or `browse`.
pub fn clause_kind(body: &Value) -> String {
    let scoring = &body["query"]["bool"]["must"][0];
    if let Some(knn) = scoring.get("knn").and_then(Value::as_object) {
        let field = knn.keys().next().cloned().unwrap_or_default();
        return format!("knn:{field}");
    }
    if let Some(q) = scoring.pointer("/multi_match/query").and_then(Value::as_str) {
        return format!("match:{q}");
    }
    if scoring.get("match_all").is_some() {
        return "browse".to_string();
    }
    "intent".to_string()
}

pub fn doc(id: &str, score: f64) -> RawHit {
    RawHit {
        doc_id: id.to_string(),
        score,
        source: json!({
            "name": format!("Resource {id}"),
            "description": format!("Resource {id} offers help. It runs a food pantry on weekends."),
            "embedding": [0.1, 0.2],
            "service": { "name": "Food", "embedding": [0.3] },
            "service_area": { "type": "Polygon", "coordinates": [] }
        }),
    }
}

pub fn located(id: &str, score: f64, lat: f64, lon: f64) -> RawHit {
    RawHit {
        doc_id: id.to_string(),
        score,
        source: json!({ "name": id, "location": { "lat": lat, "lon": lon } }),
    }
}

// ─── Adapters ────────────────────────────────────────────

pub struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.25; 4])
    }
}

pub struct FixedClassifier(pub IntentClassification);

impl FixedClassifier {
    pub fn rent() -> Self {
        Self(IntentClassification {
            primary_intent: "rent payment assistance".to_string(),
            confidence: 0.91,
            combined_taxonomy_codes: vec!["BH-3800.7000".to_string()],
            is_low_information_query: false,
            top_intents: vec![TopIntent {
                intent: "rent payment assistance".to_string(),
                confidence: 0.91,
            }],
        })
    }
}

#[async_trait]
impl IntentClassifier for FixedClassifier {
    async fn classify(&self, _query: &str) -> anyhow::Result<IntentClassification> {
        Ok(self.0.clone())
    }
}

/// Every call fails, for all three adapter kinds.
pub struct BrokenService;

#[async_trait]
impl Embedder for BrokenService {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("503 from embedding service")
    }
}

#[async_trait]
impl IntentClassifier for BrokenService {
    async fn classify(&self, _query: &str) -> anyhow::Result<IntentClassification> {
        anyhow::bail!("503 from classifier")
    }
}

#[async_trait]
impl Reranker for BrokenService {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[RerankDocument],
        _top_k: usize,
    ) -> anyhow::Result<Vec<RankedDocument>> {
        anyhow::bail!("503 from reranker")
    }
}

/// Scores documents in reverse of the order it received them.
pub struct ReversingReranker;

#[async_trait]
impl Reranker for ReversingReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[RerankDocument],
        _top_k: usize,
    ) -> anyhow::Result<Vec<RankedDocument>> {
        Ok(documents
            .iter()
            .enumerate()
            .map(|(i, d)| RankedDocument {
                id: d.id.clone(),
                score: i as f64,
            })
            .collect())
    }
}

pub fn store() -> Arc<WeightStore> {
    Arc::new(WeightStore::new(WeightConfig::default()))
}

pub fn orchestrator(backend: Arc<FakeBackend>, weights: Arc<WeightStore>) -> Orchestrator {
    let pipeline = Pipeline::new(
        Arc::new(NlpEngine::new()),
        Arc::new(MapSynonyms::empty()),
        None,
        Duration::from_secs(1),
    );
    Orchestrator::new(
        weights,
        Arc::new(pipeline),
        backend,
        OrchestratorSettings::default(),
    )
}
