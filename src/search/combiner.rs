use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::{GeoScorer, Strategy, StrategyResult};

/// One strategy's share of a document's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceContribution {
    pub strategy: String,
    pub pre_weight_score: f64,
    pub weight_applied: f64,
}

impl SourceContribution {
    pub fn contribution(&self) -> f64 {
        self.pre_weight_score * self.weight_applied
    }
}

/// A document after cross-strategy deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedHit {
    pub doc_id: String,
    pub total_score: f64,
    pub sources: Vec<SourceContribution>,
    pub source: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopHitTrace {
    pub rank: usize,
    pub doc_id: String,
    pub total_score: f64,
    pub sources: Vec<SourceContribution>,
}

/// Weighted-sum fusion across strategies.
///
/// 1. Every hit of every strategy adds one `SourceContribution` to its
///    document (first `_source` seen is kept).
/// 2. With a `geo` scorer, each located document gets one more
///    `geospatial` contribution.
/// 3. `total_score` is the plain sum of `pre_weight_score × weight_applied`.
/// 4. Sorted by score descending, then document id ascending.
pub fn combine(results: &[StrategyResult], geo: Option<&GeoScorer>) -> Vec<CombinedHit> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, CombinedHit> = HashMap::new();

    for result in results {
        for hit in &result.hits {
            let entry = by_id.entry(hit.doc_id.clone()).or_insert_with(|| {
                order.push(hit.doc_id.clone());
                CombinedHit {
                    doc_id: hit.doc_id.clone(),
                    total_score: 0.0,
                    sources: Vec::new(),
                    source: hit.source.clone(),
                }
            });
            // A strategy counts once per document even if the backend
            // repeated the hit.
            if entry.sources.iter().any(|s| s.strategy == result.strategy) {
                continue;
            }
            entry.sources.push(SourceContribution {
                strategy: result.strategy.clone(),
                pre_weight_score: hit.score,
                weight_applied: result.weight,
            });
        }
    }

    let mut combined: Vec<CombinedHit> = order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect();

    for hit in &mut combined {
        if let Some(scorer) = geo.filter(|g| g.weight > 0.0) {
            if let Some(decay) = scorer.decay_for(&hit.source) {
                hit.sources.push(SourceContribution {
                    strategy: Strategy::Geospatial.as_str().to_string(),
                    pre_weight_score: decay,
                    weight_applied: scorer.weight,
                });
            }
        }
        hit.total_score = hit.sources.iter().map(SourceContribution::contribution).sum();
    }

    sort_combined(&mut combined);
    combined
}

/// Score descending, id ascending.
pub fn sort_combined(hits: &mut [CombinedHit]) {
    hits.sort_by(|a, b| {
        b.total_score
            .total_cmp(&a.total_score)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
}

/// Rank and breakdown of the first `n` hits, for response metadata.
pub fn top_hit_trace(hits: &[CombinedHit], n: usize) -> Vec<TopHitTrace> {
    hits.iter()
        .take(n)
        .enumerate()
        .map(|(i, h)| TopHitTrace {
            rank: i + 1,
            doc_id: h.doc_id.clone(),
            total_score: h.total_score,
            sources: h.sources.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{GeoPoint, RawHit};
    use crate::weights::GeospatialWeights;
    use serde_json::json;

    fn hit(id: &str, score: f64) -> RawHit {
        RawHit {
            doc_id: id.to_string(),
            score,
            source: json!({ "name": format!("doc {id}") }),
        }
    }

    fn result(strategy: &str, weight: f64, hits: Vec<RawHit>) -> StrategyResult {
        StrategyResult {
            strategy: strategy.to_string(),
            weight,
            took_ms: 1,
            total: hits.len() as u64,
            timed_out: false,
            hits,
            error: None,
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert!(combine(&[], None).is_empty());
        assert!(combine(&[result("keyword_original", 1.0, vec![])], None).is_empty());
    }

    #[test]
    fn test_total_is_exact_weighted_sum() {
        let results = vec![
            result("semantic_service", 1.7, vec![hit("a", 0.83), hit("b", 0.51)]),
            result("keyword_original", 0.4, vec![hit("a", 12.5)]),
            result("intent_driven", 3.25, vec![hit("a", 2.0), hit("c", 9.0)]),
        ];
        let combined = combine(&results, None);
        let a = combined.iter().find(|h| h.doc_id == "a").unwrap();
        let expected = 0.83 * 1.7 + 12.5 * 0.4 + 2.0 * 3.25;
        assert_eq!(a.total_score, expected);
        let from_sources: f64 = a.sources.iter().map(|s| s.contribution()).sum();
        assert_eq!(a.total_score, from_sources);
    }

    #[test]
    fn test_k_strategies_give_k_sources() {
        let results = vec![
            result("semantic_service", 1.0, vec![hit("a", 1.0)]),
            result("semantic_taxonomy", 1.0, vec![hit("a", 1.0)]),
            result("keyword_original", 1.0, vec![hit("a", 1.0), hit("b", 1.0)]),
            result("keyword_nouns", 1.0, vec![hit("a", 1.0)]),
        ];
        let combined = combine(&results, None);
        let a = combined.iter().find(|h| h.doc_id == "a").unwrap();
        let b = combined.iter().find(|h| h.doc_id == "b").unwrap();
        assert_eq!(a.sources.len(), 4);
        assert_eq!(b.sources.len(), 1);
        let names: Vec<&str> = a.sources.iter().map(|s| s.strategy.as_str()).collect();
        assert_eq!(
            names,
            vec!["semantic_service", "semantic_taxonomy", "keyword_original", "keyword_nouns"]
        );
    }

    #[test]
    fn test_repeated_hit_in_one_strategy_counted_once() {
        let results = vec![result("keyword_original", 1.0, vec![hit("a", 2.0), hit("a", 1.0)])];
        let combined = combine(&results, None);
        assert_eq!(combined[0].sources.len(), 1);
        assert_eq!(combined[0].total_score, 2.0);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let results = vec![result(
            "keyword_original",
            1.0,
            vec![hit("zeta", 1.0), hit("alpha", 1.0), hit("mid", 3.0)],
        )];
        let ids: Vec<String> = combine(&results, None)
            .into_iter()
            .map(|h| h.doc_id)
            .collect();
        assert_eq!(ids, vec!["mid", "alpha", "zeta"]);
    }

    #[test]
    fn test_zero_weight_strategy_still_listed() {
        let results = vec![
            result("keyword_original", 1.0, vec![hit("a", 1.0)]),
            result("keyword_nouns", 0.0, vec![hit("a", 5.0)]),
        ];
        let combined = combine(&results, None);
        assert_eq!(combined[0].sources.len(), 2);
        assert_eq!(combined[0].total_score, 1.0);
    }

    #[test]
    fn test_geo_contribution_added() {
        let near = RawHit {
            doc_id: "near".into(),
            score: 1.0,
            source: json!({"location": {"lat": 40.0, "lon": -75.0}}),
        };
        let far = RawHit {
            doc_id: "far".into(),
            score: 1.0,
            source: json!({"location": {"lat": 41.0, "lon": -75.0}}),
        };
        let nowhere = hit("nowhere", 1.0);
        let scorer = GeoScorer::new(
            GeoPoint::new(40.0, -75.0).unwrap(),
            &GeospatialWeights {
                weight: 2.0,
                decay_scale: 50.0,
                decay_offset: 0.0,
            },
        );
        let combined = combine(
            &[result("browse", 1.0, vec![far, nowhere, near])],
            Some(&scorer),
        );
        assert_eq!(combined[0].doc_id, "near");
        assert_eq!(combined[0].total_score, 3.0);
        assert_eq!(combined[0].sources[1].strategy, "geospatial");
        assert_eq!(combined[1].doc_id, "far");
        assert!(combined[1].total_score > 1.0 && combined[1].total_score < 3.0);
        assert_eq!(combined[2].doc_id, "nowhere");
        assert_eq!(combined[2].sources.len(), 1);
    }

    #[test]
    fn test_top_hit_trace() {
        let results = vec![result(
            "keyword_original",
            2.0,
            vec![hit("a", 3.0), hit("b", 2.0), hit("c", 1.0)],
        )];
        let combined = combine(&results, None);
        let trace = top_hit_trace(&combined, 2);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].rank, 1);
        assert_eq!(trace[0].doc_id, "a");
        assert_eq!(trace[0].total_score, 6.0);
        assert_eq!(trace[1].sources[0].pre_weight_score, 2.0);
    }
}
