//! Versioned query enhancement.
//!
//! A pipeline run threads one [`SearchContext`] through the ordered stage
//! list chosen for an [`ApiVersion`]. Each stage takes the context by value
//! and hands back the next one; stages that do not apply are skipped and
//! never stop the stages after them.

pub mod stages;
pub mod strategy;
pub mod synonyms;

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::nlp::NlpEngine;
use crate::upstream::{IntentClassification, IntentClassifier};

pub use stages::{intent_applicable, Stage, StageDeps};
pub use strategy::{ApiVersion, StrategySelector};
pub use synonyms::{MapSynonyms, SynonymSource};

/// Taxonomy code shape: one or two letters, optionally followed by up to four
/// dotted numeric levels ("BD", "BD-1800", "BD-1800.2000-300").
pub const CODE_PATTERN: &str = r"^[A-Za-z]{1,2}(-\d{1,4}(\.\d{1,4}){0,3})?$";

/// Fields searched for a taxonomy code.
pub const CODE_FIELDS: &[&str] = &["code", "code._2gram", "code._3gram"];
/// Fields searched for free text.
pub const NAME_FIELDS: &[&str] = &["name", "name._2gram", "name._3gram"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    User,
    Intent,
    Synonym,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::User => "user",
            QueryType::Intent => "intent",
            QueryType::Synonym => "synonym",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedQuery {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: QueryType,
    pub source: String,
}

impl ProcessedQuery {
    pub fn new(query: impl Into<String>, kind: QueryType, source: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            kind,
            source: source.into(),
        }
    }

    /// Label used when this query runs as its own retrieval strategy.
    pub fn strategy_name(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.source)
    }
}

/// Capabilities switched on for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Stemming,
    SynonymExpansion,
    IntentClassification,
    GenericNounFilter,
    /// Keep every query source as a separate candidate instead of merging.
    DualQuery,
}

/// Per-request enhancement state. Created for one request and dropped with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchContext {
    pub original_query: String,
    pub is_code_search: bool,
    pub fields: Vec<String>,
    pub processed_queries: Vec<ProcessedQuery>,
    pub features: BTreeSet<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_classification: Option<IntentClassification>,
}

impl SearchContext {
    pub fn new(query: &str, features: BTreeSet<Feature>) -> Self {
        Self {
            original_query: query.trim().to_string(),
            is_code_search: false,
            fields: Vec::new(),
            processed_queries: Vec::new(),
            features,
            intent_classification: None,
        }
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    fn primary_user_query_mut(&mut self) -> Option<&mut ProcessedQuery> {
        self.processed_queries
            .iter_mut()
            .find(|q| q.kind == QueryType::User)
    }

    /// The stemmed user query, when stemming produced a distinct one.
    pub fn stemmed_query(&self) -> Option<&str> {
        self.processed_queries
            .iter()
            .find(|q| q.kind == QueryType::User && q.source == "stemmed")
            .map(|q| q.query.as_str())
    }

    /// All processed queries folded into one string, first occurrence of
    /// each term kept.
    pub fn merged_query(&self) -> String {
        let mut seen = std::collections::HashSet::new();
        self.processed_queries
            .iter()
            .flat_map(|q| q.query.split_whitespace())
            .filter(|t| seen.insert(t.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The enhancement pipeline with its collaborators wired in.
pub struct Pipeline {
    nlp: Arc<NlpEngine>,
    synonyms: Arc<dyn SynonymSource>,
    classifier: Option<Arc<dyn IntentClassifier>>,
    classify_timeout: Duration,
    code_pattern: Regex,
}

impl Pipeline {
    pub fn new(
        nlp: Arc<NlpEngine>,
        synonyms: Arc<dyn SynonymSource>,
        classifier: Option<Arc<dyn IntentClassifier>>,
        classify_timeout: Duration,
    ) -> Self {
        Self {
            nlp,
            synonyms,
            classifier,
            classify_timeout,
            code_pattern: Regex::new(CODE_PATTERN).expect("code pattern is valid"),
        }
    }

    pub fn is_code_query(&self, query: &str) -> bool {
        self.code_pattern.is_match(query.trim())
    }

    pub fn nlp(&self) -> &NlpEngine {
        &self.nlp
    }

    pub async fn run(
        &self,
        version: ApiVersion,
        query: &str,
        disable_intent_classification: bool,
    ) -> SearchContext {
        let mut features = StrategySelector::features(version);
        if disable_intent_classification {
            features.remove(&Feature::IntentClassification);
        }
        let ctx = SearchContext::new(query, features);
        self.run_stages(ctx, StrategySelector::stages(version)).await
    }

    /// Code detection and stemming for the main search. The result has the
    /// original query first and, when it differs, its stemmed form as a
    /// separate `user/stemmed` entry.
    pub async fn analyze_for_search(&self, query: &str) -> SearchContext {
        let ctx = SearchContext::new(query, StrategySelector::search_features());
        self.run_stages(ctx, StrategySelector::search_stages()).await
    }

    async fn run_stages(&self, mut ctx: SearchContext, stages: &[Stage]) -> SearchContext {
        let deps = StageDeps {
            nlp: &self.nlp,
            synonyms: self.synonyms.as_ref(),
            classifier: self.classifier.as_deref(),
            classify_timeout: self.classify_timeout,
            code_pattern: &self.code_pattern,
        };

        for stage in stages {
            if stage.should_process(&ctx, &deps) {
                ctx = stage.process(ctx, &deps).await;
                tracing::debug!(
                    stage = stage.name(),
                    queries = ctx.processed_queries.len(),
                    "pipeline stage applied"
                );
            }
        }
        ctx
    }
}
