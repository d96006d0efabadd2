//! End-to-end search requests through the orchestrator, with an in-process
//! backend and fake adapters.

mod common;

use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

use common::*;
use directory_search::error::SearchError;
use directory_search::models::{SearchRequest, SearchResponse};
use directory_search::weights::WeightConfig;

fn request(body: Value) -> SearchRequest {
    serde_json::from_value(body).unwrap()
}

fn ids(resp: &SearchResponse) -> Vec<String> {
    resp.hits.hits.iter().map(|h| h.id.clone()).collect()
}

/// 25 browse hits in tied groups of three: scores 8, 8, 8, 7, 7, 7, ...
fn tied_corpus(body: &Value) -> Vec<directory_search::search::RawHit> {
    if clause_kind(body) != "browse" {
        return Vec::new();
    }
    (0..25)
        .map(|i| doc(&format!("doc-{:02}", 24 - i), 8.0 - (i / 3) as f64))
        .collect()
}

#[tokio::test]
async fn test_cursor_pages_are_disjoint_with_stable_total() {
    let backend = Arc::new(FakeBackend::new(tied_corpus));
    let orch = orchestrator(backend.clone(), store());

    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor: Option<Value> = None;
    let mut pages = 0;
    loop {
        let mut body = json!({ "limit": 10 });
        if let Some(c) = &cursor {
            body["search_after"] = c.clone();
        }
        let resp = orch.search(request(body)).await.unwrap();
        assert_eq!(resp.hits.total.value, 25);
        assert_eq!(resp.hits.total.relation, "eq");
        for id in ids(&resp) {
            assert!(seen.insert(id.clone()), "{id} served twice");
        }
        pages += 1;
        cursor = resp.search_after.clone();
        if cursor.is_none() {
            assert_eq!(resp.hits.hits.len(), 5);
            break;
        }
        assert_eq!(resp.hits.hits.len(), 10);
    }
    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 25);
}

#[tokio::test]
async fn test_ties_ordered_by_document_id() {
    let backend = Arc::new(FakeBackend::new(tied_corpus));
    let orch = orchestrator(backend, store());
    let resp = orch.search(request(json!({ "limit": 4 }))).await.unwrap();
    // The three 8.0 hits are doc-24, doc-23, doc-22; ascending id order.
    assert_eq!(ids(&resp), vec!["doc-22", "doc-23", "doc-24", "doc-19"]);
    assert_eq!(resp.search_after.as_ref().unwrap()[1], "doc-19");
    assert_eq!(resp.metadata.search_mode, "browse");
}

#[tokio::test]
async fn test_hybrid_search_fans_out_and_explains_scores() {
    let backend = Arc::new(FakeBackend::new(|body| match clause_kind(body).as_str() {
        "knn:service.embedding" => vec![doc("a", 0.9), doc("b", 0.8)],
        "knn:taxonomies.embedding" => vec![doc("a", 0.7)],
        "intent" => vec![doc("c", 1.0)],
        k if k.starts_with("match:") => vec![doc("a", 5.0), doc("c", 4.0)],
        _ => Vec::new(),
    }));
    let orch = orchestrator(backend.clone(), store())
        .with_embedder(Arc::new(FixedEmbedder))
        .with_classifier(Arc::new(FixedClassifier::rent()));

    let resp = orch
        .search(request(json!({ "q": "help paying my rent this month" })))
        .await
        .unwrap();

    let kinds: Vec<String> = backend.bodies().iter().map(clause_kind).collect();
    assert!(kinds.contains(&"knn:service.embedding".to_string()));
    assert!(kinds.contains(&"knn:organization.embedding".to_string()));
    assert!(kinds.contains(&"intent".to_string()));
    assert!(kinds.contains(&"match:help paying my rent this month".to_string()));
    assert_eq!(backend.indexes(), vec!["resources_en"]);

    let intent_body = backend
        .bodies()
        .into_iter()
        .find(|b| clause_kind(b) == "intent")
        .unwrap();
    assert_eq!(
        intent_body["query"]["bool"]["must"][0]["bool"]["should"][0],
        json!({"term": {"taxonomies.code": "BH-3800.7000"}})
    );

    for hit in &resp.hits.hits {
        let sum: f64 = hit
            .sources
            .iter()
            .map(|s| s.pre_weight_score * s.weight_applied)
            .sum();
        assert_eq!(hit.score, sum);
        let names: HashSet<&str> = hit.sources.iter().map(|s| s.strategy.as_str()).collect();
        assert_eq!(names.len(), hit.sources.len(), "strategy listed twice");
    }

    let a = resp.hits.hits.iter().find(|h| h.id == "a").unwrap();
    let a_sources: Vec<&str> = a.sources.iter().map(|s| s.strategy.as_str()).collect();
    assert!(a_sources.contains(&"semantic_service"));
    assert!(a_sources.contains(&"semantic_taxonomy"));
    assert!(a_sources.contains(&"keyword_original"));
    let c = resp.hits.hits.iter().find(|h| h.id == "c").unwrap();
    assert!(c.sources.iter().any(|s| s.strategy == "intent_driven"));

    assert_eq!(ids(&resp)[0], "a");
    assert_eq!(resp.metadata.search_mode, "hybrid");
    let intent = resp.metadata.intent_classification.as_ref().unwrap();
    assert_eq!(intent.primary_intent, "rent payment assistance");
    let timings = &resp.metadata.granular_phase_timings;
    assert_eq!(timings.strategies.get("intent_driven"), Some(&3));
    assert_eq!(resp.metadata.sources_of_top_hits[0].rank, 1);
    assert_eq!(resp.metadata.sources_of_top_hits[0].doc_id, "a");
}

#[tokio::test]
async fn test_adapter_failures_degrade_not_fail() {
    let backend = Arc::new(FakeBackend::new(|body| {
        if clause_kind(body).starts_with("match:") {
            vec![doc("x", 2.0), doc("y", 1.0)]
        } else {
            Vec::new()
        }
    }));
    let orch = orchestrator(backend.clone(), store())
        .with_embedder(Arc::new(BrokenService))
        .with_classifier(Arc::new(BrokenService))
        .with_reranker(Arc::new(BrokenService));

    let resp = orch
        .search(request(json!({ "q": "emergency shelter for families tonight" })))
        .await
        .unwrap();

    assert_eq!(ids(&resp), vec!["x", "y"]);
    let kinds: Vec<String> = backend.bodies().iter().map(clause_kind).collect();
    assert!(kinds.iter().all(|k| k.starts_with("match:")));
    let intent = resp.metadata.intent_classification.unwrap();
    assert_eq!(intent.confidence, 0.0);
    assert!(!intent.is_low_information_query);
    assert!(intent.combined_taxonomy_codes.is_empty());
}

#[tokio::test]
async fn test_backend_unreachable_is_fatal() {
    let orch = orchestrator(Arc::new(FakeBackend::unreachable()), store());
    let err = orch
        .search(request(json!({ "q": "food" })))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Backend(_)));
}

#[tokio::test]
async fn test_keyword_only_skips_adapters() {
    let backend = Arc::new(FakeBackend::new(|_| vec![doc("k", 1.0)]));
    let orch = orchestrator(backend.clone(), store())
        .with_embedder(Arc::new(FixedEmbedder))
        .with_classifier(Arc::new(FixedClassifier::rent()));

    let resp = orch
        .search(request(json!({
            "q": "help paying my rent this month",
            "keyword_search_only": true
        })))
        .await
        .unwrap();
    assert!(backend
        .bodies()
        .iter()
        .all(|b| clause_kind(b).starts_with("match:")));
    assert!(resp.metadata.intent_classification.is_none());
    assert_eq!(resp.metadata.search_mode, "keyword");
}

#[tokio::test]
async fn test_short_query_not_classified() {
    let backend = Arc::new(FakeBackend::new(|_| Vec::new()));
    let orch = orchestrator(backend, store()).with_classifier(Arc::new(FixedClassifier::rent()));
    let resp = orch.search(request(json!({ "q": "rent" }))).await.unwrap();
    assert!(resp.metadata.intent_classification.is_none());
    assert!(resp.hits.hits.is_empty());
    assert!(resp.search_after.is_none());
}

#[tokio::test]
async fn test_code_query_searches_code_fields() {
    let backend = Arc::new(FakeBackend::new(|_| vec![doc("t", 1.0)]));
    let orch = orchestrator(backend.clone(), store()).with_embedder(Arc::new(FixedEmbedder));
    orch.search(request(json!({ "q": "BD-1800.2000" }))).await.unwrap();

    let bodies = backend.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0]["query"]["bool"]["must"][0]["multi_match"]["fields"][0],
        "taxonomies.code^3"
    );
}

#[tokio::test]
async fn test_invalid_custom_weights_rejected() {
    let orch = orchestrator(Arc::new(FakeBackend::new(|_| Vec::new())), store());
    let err = orch
        .search(request(json!({
            "q": "food",
            "custom_weights": { "semantic": { "service": 20.0 } }
        })))
        .await
        .unwrap_err();
    match err {
        SearchError::Validation(msg) => assert!(msg.contains("semantic.service")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_custom_weights_applied_per_request() {
    let backend = Arc::new(FakeBackend::new(|body| {
        if clause_kind(body) == "match:shelter" {
            vec![doc("s", 2.0)]
        } else {
            Vec::new()
        }
    }));
    let weights = store();
    let orch = orchestrator(backend, weights.clone());

    let resp = orch
        .search(request(json!({
            "q": "shelter",
            "keyword_weight": 2.0,
            "custom_weights": { "strategies": { "keyword_search": 3.0 } }
        })))
        .await
        .unwrap();
    let original = resp.hits.hits[0]
        .sources
        .iter()
        .find(|s| s.strategy == "keyword_original")
        .unwrap();
    assert_eq!(original.weight_applied, 3.0);
    // The shared snapshot is untouched.
    assert_eq!(weights.snapshot().strategies.keyword_search, 1.0);
    assert_ne!(
        resp.metadata.weights_fingerprint,
        WeightConfig::default().fingerprint()
    );
}

#[tokio::test]
async fn test_cursor_from_other_weights_rejected() {
    let backend = Arc::new(FakeBackend::new(tied_corpus));
    let weights = store();
    let orch = orchestrator(backend, weights.clone());

    let first = orch.search(request(json!({ "limit": 5 }))).await.unwrap();
    let cursor = first.search_after.unwrap();

    let mut changed = WeightConfig::default();
    changed.geospatial.weight = 4.0;
    weights.reload(changed).unwrap();

    let err = orch
        .search(request(json!({ "limit": 5, "search_after": cursor })))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Validation(_)));

    // A bare two-element cursor carries no fingerprint and is accepted.
    let resp = orch
        .search(request(json!({ "limit": 5, "search_after": [8.0, "doc-22"] })))
        .await
        .unwrap();
    assert_eq!(ids(&resp)[0], "doc-23");
}

#[tokio::test]
async fn test_malformed_input_rejected() {
    let orch = orchestrator(Arc::new(FakeBackend::new(|_| Vec::new())), store());
    for body in [
        json!({ "lat": 40.0 }),
        json!({ "lat": 95.0, "lon": 0.0 }),
        json!({ "lat": 40.0, "lon": -75.0, "distance": 0 }),
        json!({ "search_after": "abc" }),
        json!({ "lang": "en/../../admin" }),
    ] {
        let err = orch.search(request(body.clone())).await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)), "accepted {body}");
    }
}

#[tokio::test]
async fn test_sources_stripped_of_vectors_and_service_area() {
    let backend = Arc::new(FakeBackend::new(|_| vec![doc("d", 1.0)]));
    let orch = orchestrator(backend, store());

    let resp = orch
        .search(request(json!({ "q": "pantry", "exclude_service_area": true })))
        .await
        .unwrap();
    let source = &resp.hits.hits[0].source;
    assert!(source.get("embedding").is_none());
    assert!(source["service"].get("embedding").is_none());
    assert!(source.get("service_area").is_none());
    assert_eq!(
        resp.hits.hits[0].relevant_text.as_deref(),
        Some("It runs a food pantry on weekends.")
    );

    let resp = orch
        .search(request(json!({ "q": "pantry" })))
        .await
        .unwrap();
    assert!(resp.hits.hits[0].source.get("service_area").is_some());
    assert!(resp.hits.hits[0].source.get("embedding").is_none());
}

#[tokio::test]
async fn test_rerank_reorders_page_but_keeps_cursor() {
    let backend = Arc::new(FakeBackend::new(|body| {
        if clause_kind(body).starts_with("match:") {
            vec![doc("x", 3.0), doc("y", 2.0), doc("z", 1.0)]
        } else {
            Vec::new()
        }
    }));
    let orch = orchestrator(backend, store()).with_reranker(Arc::new(ReversingReranker));

    let resp = orch
        .search(request(json!({ "q": "shelter", "limit": 2 })))
        .await
        .unwrap();
    assert_eq!(ids(&resp), vec!["y", "x"]);
    assert_eq!(resp.search_after.as_ref().unwrap()[1], "y");

    let next = orch
        .search(request(json!({
            "q": "shelter",
            "limit": 2,
            "search_after": resp.search_after.unwrap()
        })))
        .await
        .unwrap();
    assert_eq!(ids(&next), vec!["z"]);
}

#[tokio::test]
async fn test_geo_filter_and_decay() {
    let backend = Arc::new(FakeBackend::new(|body| {
        if clause_kind(body) == "browse" {
            vec![
                located("far", 1.0, 40.5, -75.0),
                located("near", 1.0, 40.01, -75.0),
            ]
        } else {
            Vec::new()
        }
    }));
    let orch = orchestrator(backend.clone(), store());

    let resp = orch
        .search(request(json!({ "lat": 40.0, "lon": -75.0, "distance": 50 })))
        .await
        .unwrap();
    assert_eq!(ids(&resp), vec!["near", "far"]);
    let near = &resp.hits.hits[0];
    let geo = near
        .sources
        .iter()
        .find(|s| s.strategy == "geospatial")
        .unwrap();
    assert_eq!(geo.weight_applied, 2.0);
    assert!(geo.pre_weight_score > 0.99 && geo.pre_weight_score <= 1.0);

    let filter = &backend.bodies()[0]["query"]["bool"]["filter"][0];
    assert_eq!(filter["geo_distance"]["distance"], "50mi");
}

#[tokio::test]
async fn test_lowercase_code_detected_like_suggestions() {
    let backend = Arc::new(FakeBackend::new(|_| Vec::new()));
    let orch = orchestrator(backend.clone(), store()).with_embedder(Arc::new(FixedEmbedder));
    orch.search(request(json!({ "q": "bd-1800" }))).await.unwrap();

    let bodies = backend.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(clause_kind(&bodies[0]), "match:bd-1800");
    assert_eq!(
        bodies[0]["query"]["bool"]["must"][0]["multi_match"]["fields"][0],
        "taxonomies.code^3"
    );
}

#[tokio::test]
async fn test_stemmed_clause_uses_pipeline_stem() {
    let backend = Arc::new(FakeBackend::new(|_| Vec::new()));
    let orch = orchestrator(backend.clone(), store());
    orch.search(request(json!({
        "q": "I need help with my grocery and utility bills",
        "keyword_search_only": true
    })))
    .await
    .unwrap();

    let kinds: Vec<String> = backend.bodies().iter().map(clause_kind).collect();
    assert_eq!(kinds[0], "match:I need help with my grocery and utility bills");
    assert!(kinds.contains(&"match:grocer util bill".to_string()));
}
