use serde_json::{json, Value};

use super::{SearchFilters, Strategy, TAXONOMY_CODE_FIELD};
use crate::weights::WeightConfig;

/// Boosted free-text fields of the resource index.
pub const TEXT_FIELDS: &[&str] = &[
    "name^3",
    "name._2gram^2",
    "name._3gram^2",
    "service.name^2",
    "organization.name^1.5",
    "taxonomies.name^1.5",
    "description",
];

/// Fields matched when the query is a taxonomy code.
pub const CODE_FIELDS: &[&str] = &[
    "taxonomies.code^3",
    "taxonomies.code._2gram",
    "taxonomies.code._3gram",
];

const SERVICE_EMBEDDING: &str = "service.embedding";
const TAXONOMY_EMBEDDING: &str = "taxonomies.embedding";
const ORGANIZATION_EMBEDDING: &str = "organization.embedding";

/// One retrieval clause ready for the batched request.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyClause {
    pub strategy: String,
    pub weight: f64,
    pub body: Value,
}

/// The lexical forms of the user query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordVariants {
    pub original: String,
    pub nouns: Option<String>,
    pub stemmed_nouns: Option<String>,
}

impl KeywordVariants {
    /// Distinct terms of every lexical variant, used to pick `relevant_text`.
    pub fn terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        let all = [
            Some(self.original.as_str()),
            self.nouns.as_deref(),
            self.stemmed_nouns.as_deref(),
        ];
        for word in all.into_iter().flatten().flat_map(str::split_whitespace) {
            let word = word.to_lowercase();
            if !terms.contains(&word) {
                terms.push(word);
            }
        }
        terms
    }
}

/// Everything the builder reads for one request. `keywords == None` means
/// browse mode.
pub struct ClauseInputs<'a> {
    pub keywords: Option<&'a KeywordVariants>,
    pub is_code_search: bool,
    pub embedding: Option<&'a [f32]>,
    /// Taxonomy codes from a successful, informative classification.
    pub intent_codes: Option<&'a [String]>,
    pub filters: &'a SearchFilters,
    pub size: usize,
}

/// Build the clause list for a request. Clauses whose effective weight is
/// zero contribute nothing and are not sent.
pub fn build_clauses(inputs: &ClauseInputs<'_>, weights: &WeightConfig) -> Vec<StrategyClause> {
    let filters = inputs.filters.to_queries();
    let mut clauses = Vec::new();

    let Some(keywords) = inputs.keywords else {
        clauses.push(StrategyClause {
            strategy: Strategy::Browse.as_str().to_string(),
            weight: 1.0,
            body: wrap(json!({ "match_all": {} }), &filters, inputs.size),
        });
        return clauses;
    };

    // ─── Semantic ────────────────────────────────────────────
    if let Some(vector) = inputs.embedding.filter(|_| !inputs.is_code_search) {
        let semantic = [
            (Strategy::SemanticService, SERVICE_EMBEDDING, weights.semantic.service),
            (Strategy::SemanticTaxonomy, TAXONOMY_EMBEDDING, weights.semantic.taxonomy),
            (
                Strategy::SemanticOrganization,
                ORGANIZATION_EMBEDDING,
                weights.semantic.organization,
            ),
        ];
        for (strategy, field, field_weight) in semantic {
            let weight = field_weight * weights.strategies.semantic_search;
            let knn = json!({ "knn": { field: { "vector": vector, "k": inputs.size } } });
            push_weighted(&mut clauses, strategy, weight, wrap(knn, &filters, inputs.size));
        }
    }

    // ─── Keyword ─────────────────────────────────────────────
    let fields = if inputs.is_code_search {
        CODE_FIELDS
    } else {
        TEXT_FIELDS
    };
    push_weighted(
        &mut clauses,
        Strategy::KeywordOriginal,
        weights.strategies.keyword_search,
        wrap(multi_match(&keywords.original, fields), &filters, inputs.size),
    );
    if !inputs.is_code_search {
        let variants = [
            (
                Strategy::KeywordNouns,
                keywords.nouns.as_deref(),
                weights.keyword_variations.nouns_multiplier,
            ),
            (
                Strategy::KeywordStemmedNouns,
                keywords.stemmed_nouns.as_deref(),
                weights.keyword_variations.stemmed_nouns_multiplier,
            ),
        ];
        for (strategy, text, weight) in variants {
            if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                push_weighted(
                    &mut clauses,
                    strategy,
                    weight,
                    wrap(multi_match(text, fields), &filters, inputs.size),
                );
            }
        }
    }

    // ─── Intent ──────────────────────────────────────────────
    if let Some(codes) = inputs.intent_codes.filter(|c| !c.is_empty()) {
        let should: Vec<Value> = codes
            .iter()
            .map(|c| json!({ "term": { TAXONOMY_CODE_FIELD: c } }))
            .collect();
        let body = json!({
            "bool": {
                "should": should,
                "minimum_should_match": 1
            }
        });
        push_weighted(
            &mut clauses,
            Strategy::IntentDriven,
            weights.strategies.intent_driven,
            wrap(body, &filters, inputs.size),
        );
    }

    clauses
}

/// `bool_prefix` multi-match over a boosted field set.
pub fn multi_match(query: &str, fields: &[&str]) -> Value {
    json!({
        "multi_match": {
            "query": query,
            "type": "bool_prefix",
            "fields": fields,
        }
    })
}

/// Wrap a scoring query with the shared filters and fetch window.
pub fn wrap(query: Value, filters: &[Value], size: usize) -> Value {
    json!({
        "size": size,
        "track_total_hits": true,
        "query": {
            "bool": {
                "must": [query],
                "filter": filters,
            }
        }
    })
}

fn push_weighted(clauses: &mut Vec<StrategyClause>, strategy: Strategy, weight: f64, body: Value) {
    if weight <= 0.0 {
        tracing::debug!(strategy = strategy.as_str(), "skipping zero-weight clause");
        return;
    }
    clauses.push(StrategyClause {
        strategy: strategy.as_str().to_string(),
        weight,
        body,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{GeoFilter, GeoPoint};

    fn variants() -> KeywordVariants {
        KeywordVariants {
            original: "food pantries for families".to_string(),
            nouns: Some("food pantries families".to_string()),
            stemmed_nouns: Some("food pantr famili".to_string()),
        }
    }

    fn names(clauses: &[StrategyClause]) -> Vec<&str> {
        clauses.iter().map(|c| c.strategy.as_str()).collect()
    }

    #[test]
    fn test_full_clause_set() {
        let kw = variants();
        let codes = vec!["BD-1800".to_string(), "BD-1800.2000".to_string()];
        let vector = vec![0.1f32, 0.2, 0.3];
        let filters = SearchFilters::default();
        let mut weights = WeightConfig::default();
        weights.semantic.taxonomy = 2.0;
        weights.strategies.semantic_search = 1.5;
        weights.strategies.intent_driven = 3.0;
        weights.keyword_variations.nouns_multiplier = 0.5;

        let clauses = build_clauses(
            &ClauseInputs {
                keywords: Some(&kw),
                is_code_search: false,
                embedding: Some(&vector),
                intent_codes: Some(&codes),
                filters: &filters,
                size: 50,
            },
            &weights,
        );

        assert_eq!(
            names(&clauses),
            vec![
                "semantic_service",
                "semantic_taxonomy",
                "semantic_organization",
                "keyword_original",
                "keyword_nouns",
                "keyword_stemmed_nouns",
                "intent_driven",
            ]
        );
        assert_eq!(clauses[0].weight, 1.5);
        assert_eq!(clauses[1].weight, 3.0);
        assert_eq!(clauses[3].weight, 1.0);
        assert_eq!(clauses[4].weight, 0.5);
        assert_eq!(clauses[6].weight, 3.0);

        let knn = &clauses[1].body["query"]["bool"]["must"][0]["knn"]["taxonomies.embedding"];
        assert_eq!(knn["k"], 50);
        assert_eq!(knn["vector"].as_array().unwrap().len(), 3);

        let intent = &clauses[6].body["query"]["bool"]["must"][0]["bool"];
        assert_eq!(intent["should"].as_array().unwrap().len(), 2);
        assert_eq!(intent["minimum_should_match"], 1);
        assert_eq!(clauses[6].body["size"], 50);
    }

    #[test]
    fn test_without_embedding_or_intent() {
        let kw = variants();
        let filters = SearchFilters::default();
        let clauses = build_clauses(
            &ClauseInputs {
                keywords: Some(&kw),
                is_code_search: false,
                embedding: None,
                intent_codes: None,
                filters: &filters,
                size: 10,
            },
            &WeightConfig::default(),
        );
        assert_eq!(
            names(&clauses),
            vec!["keyword_original", "keyword_nouns", "keyword_stemmed_nouns"]
        );
    }

    #[test]
    fn test_code_search_uses_code_fields_only() {
        let kw = KeywordVariants {
            original: "BD-1800".to_string(),
            ..Default::default()
        };
        let vector = vec![0.5f32];
        let filters = SearchFilters::default();
        let clauses = build_clauses(
            &ClauseInputs {
                keywords: Some(&kw),
                is_code_search: true,
                embedding: Some(&vector),
                intent_codes: None,
                filters: &filters,
                size: 10,
            },
            &WeightConfig::default(),
        );
        assert_eq!(names(&clauses), vec!["keyword_original"]);
        let fields = &clauses[0].body["query"]["bool"]["must"][0]["multi_match"]["fields"];
        assert_eq!(fields[0], "taxonomies.code^3");
    }

    #[test]
    fn test_zero_weight_clauses_skipped() {
        let kw = variants();
        let filters = SearchFilters::default();
        let mut weights = WeightConfig::default();
        weights.keyword_variations.stemmed_nouns_multiplier = 0.0;
        weights.strategies.keyword_search = 0.0;
        let clauses = build_clauses(
            &ClauseInputs {
                keywords: Some(&kw),
                is_code_search: false,
                embedding: None,
                intent_codes: None,
                filters: &filters,
                size: 10,
            },
            &weights,
        );
        assert_eq!(names(&clauses), vec!["keyword_nouns"]);
    }

    #[test]
    fn test_browse_mode_single_filtered_clause() {
        let filters = SearchFilters {
            geo: Some(GeoFilter {
                origin: GeoPoint::new(40.0, -75.0).unwrap(),
                distance_miles: 5.0,
            }),
            ..Default::default()
        };
        let clauses = build_clauses(
            &ClauseInputs {
                keywords: None,
                is_code_search: false,
                embedding: None,
                intent_codes: None,
                filters: &filters,
                size: 20,
            },
            &WeightConfig::default(),
        );
        assert_eq!(names(&clauses), vec!["browse"]);
        let bool_q = &clauses[0].body["query"]["bool"];
        assert_eq!(bool_q["must"][0], json!({"match_all": {}}));
        assert_eq!(bool_q["filter"][0]["geo_distance"]["distance"], "5mi");
    }

    #[test]
    fn test_filters_shared_by_every_clause() {
        let kw = variants();
        let vector = vec![0.1f32];
        let filters = SearchFilters {
            taxonomy: crate::search::TaxonomyFilter {
                and: vec!["BD".to_string()],
                or: vec![],
            },
            ..Default::default()
        };
        let clauses = build_clauses(
            &ClauseInputs {
                keywords: Some(&kw),
                is_code_search: false,
                embedding: Some(&vector),
                intent_codes: None,
                filters: &filters,
                size: 10,
            },
            &WeightConfig::default(),
        );
        for clause in &clauses {
            assert_eq!(
                clause.body["query"]["bool"]["filter"][0],
                json!({"term": {"taxonomies.code": "BD"}})
            );
        }
    }
}
