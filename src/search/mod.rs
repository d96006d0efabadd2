//! Multi-strategy retrieval: clause building, batched execution against the
//! index, score combination and pagination.

pub mod combiner;
pub mod cursor;
pub mod executor;
pub mod geo;
pub mod query_builder;
pub mod snippet;

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub use combiner::{combine, top_hit_trace, CombinedHit, SourceContribution, TopHitTrace};
pub use cursor::Cursor;
pub use executor::{execute_batch, OpenSearchBackend, SearchBackend};
pub use geo::{GeoFilter, GeoPoint, GeoScorer};
pub use query_builder::{build_clauses, ClauseInputs, KeywordVariants, StrategyClause};

/// Document field holding the service location.
pub const LOCATION_FIELD: &str = "location";
/// Document field holding assigned taxonomy codes.
pub const TAXONOMY_CODE_FIELD: &str = "taxonomies.code";

/// Retrieval strategies of the main search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    SemanticService,
    SemanticTaxonomy,
    SemanticOrganization,
    KeywordOriginal,
    KeywordNouns,
    KeywordStemmedNouns,
    IntentDriven,
    Browse,
    Geospatial,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::SemanticService => "semantic_service",
            Strategy::SemanticTaxonomy => "semantic_taxonomy",
            Strategy::SemanticOrganization => "semantic_organization",
            Strategy::KeywordOriginal => "keyword_original",
            Strategy::KeywordNouns => "keyword_nouns",
            Strategy::KeywordStemmedNouns => "keyword_stemmed_nouns",
            Strategy::IntentDriven => "intent_driven",
            Strategy::Browse => "browse",
            Strategy::Geospatial => "geospatial",
        }
    }
}

/// One hit as returned by the backend for a single clause.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub doc_id: String,
    pub score: f64,
    pub source: Value,
}

/// Outcome of one executed clause.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub strategy: String,
    pub weight: f64,
    pub took_ms: u64,
    /// Matches the backend counted, which may exceed `hits.len()`.
    pub total: u64,
    pub timed_out: bool,
    pub hits: Vec<RawHit>,
    /// Set when the backend rejected this clause; `hits` is then empty.
    pub error: Option<String>,
}

/// Taxonomy filter: every `and` code must be present, and at least one `or`
/// code when `or` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxonomyFilter {
    pub and: Vec<String>,
    pub or: Vec<String>,
}

/// Filters shared by every clause of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub geo: Option<GeoFilter>,
    pub taxonomy: TaxonomyFilter,
    pub facets: BTreeMap<String, Vec<String>>,
}

impl SearchFilters {
    pub fn to_queries(&self) -> Vec<Value> {
        let mut filters = Vec::new();
        if let Some(geo) = &self.geo {
            filters.push(geo.to_query(LOCATION_FIELD));
        }
        for code in &self.taxonomy.and {
            filters.push(serde_json::json!({ "term": { TAXONOMY_CODE_FIELD: code } }));
        }
        if !self.taxonomy.or.is_empty() {
            filters.push(serde_json::json!({ "terms": { TAXONOMY_CODE_FIELD: self.taxonomy.or } }));
        }
        for (field, values) in &self.facets {
            if values.is_empty() {
                continue;
            }
            filters.push(serde_json::json!({
                "terms": { format!("facets.{field}"): values }
            }));
        }
        filters
    }
}
