use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;

use super::synonyms::SynonymSource;
use super::{Feature, ProcessedQuery, QueryType, SearchContext, CODE_FIELDS, NAME_FIELDS};
use crate::nlp::{is_short_query, NlpEngine, MIN_STEM_CHARS};
use crate::upstream::{classify_with_fallback, IntentClassification, IntentClassifier};

/// Minimum confidence for a secondary intent to contribute query terms.
const SECONDARY_INTENT_MIN_CONFIDENCE: f64 = 0.5;

/// Everything a stage may consult. Stages own no state of their own.
pub struct StageDeps<'a> {
    pub nlp: &'a NlpEngine,
    pub synonyms: &'a dyn SynonymSource,
    pub classifier: Option<&'a dyn IntentClassifier>,
    pub classify_timeout: Duration,
    pub code_pattern: &'a Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CodeDetection,
    Stemming,
    SynonymExpansion,
    IntentClassification,
    GenericNounFilter,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::CodeDetection => "code_detection",
            Stage::Stemming => "stemming",
            Stage::SynonymExpansion => "synonym_expansion",
            Stage::IntentClassification => "intent_classification",
            Stage::GenericNounFilter => "generic_noun_filter",
        }
    }

    pub fn should_process(&self, ctx: &SearchContext, deps: &StageDeps<'_>) -> bool {
        match self {
            Stage::CodeDetection => true,
            Stage::Stemming => {
                ctx.has(Feature::Stemming)
                    && !ctx.is_code_search
                    && ctx.original_query.chars().count() >= MIN_STEM_CHARS
            }
            Stage::SynonymExpansion => ctx.has(Feature::SynonymExpansion) && !ctx.is_code_search,
            Stage::IntentClassification => {
                ctx.has(Feature::IntentClassification)
                    && deps.classifier.is_some()
                    && intent_applicable(ctx.is_code_search, false, &ctx.original_query)
            }
            Stage::GenericNounFilter => ctx.has(Feature::GenericNounFilter),
        }
    }

    pub async fn process(self, ctx: SearchContext, deps: &StageDeps<'_>) -> SearchContext {
        match self {
            Stage::CodeDetection => detect_code(ctx, deps),
            Stage::Stemming => stem(ctx, deps),
            Stage::SynonymExpansion => expand_synonyms(ctx, deps),
            Stage::IntentClassification => classify_intent(ctx, deps).await,
            Stage::GenericNounFilter => filter_generic(ctx, deps),
        }
    }
}

/// Intent classification is pointless for codes, when the caller opted out,
/// and for queries of two words or fewer.
pub fn intent_applicable(is_code_search: bool, disabled: bool, query: &str) -> bool {
    !is_code_search && !disabled && !is_short_query(query)
}

fn detect_code(mut ctx: SearchContext, deps: &StageDeps<'_>) -> SearchContext {
    ctx.is_code_search = deps.code_pattern.is_match(&ctx.original_query);
    let fields = if ctx.is_code_search {
        CODE_FIELDS
    } else {
        NAME_FIELDS
    };
    ctx.fields = fields.iter().map(|f| f.to_string()).collect();
    ctx.processed_queries = vec![ProcessedQuery::new(
        ctx.original_query.clone(),
        QueryType::User,
        "original",
    )];
    ctx
}

fn stem(mut ctx: SearchContext, deps: &StageDeps<'_>) -> SearchContext {
    let result = deps.nlp.stem_query_for_suggestion(&ctx.original_query);
    if !result.should_use_stemmed || result.stemmed.chars().count() < MIN_STEM_CHARS {
        return ctx;
    }

    if ctx.has(Feature::DualQuery) {
        ctx.processed_queries.push(ProcessedQuery::new(
            result.stemmed,
            QueryType::User,
            "stemmed",
        ));
    } else if let Some(user) = ctx.primary_user_query_mut() {
        if user.query != result.stemmed {
            user.query = result.stemmed;
            user.source = "stemmed".to_string();
        }
    }
    ctx
}

fn expand_synonyms(mut ctx: SearchContext, deps: &StageDeps<'_>) -> SearchContext {
    let nouns = deps.nlp.extract_nouns(&ctx.original_query);
    let existing: HashSet<String> = ctx
        .processed_queries
        .iter()
        .flat_map(|q| q.query.split_whitespace().map(|t| t.to_lowercase()))
        .chain(nouns.iter().cloned())
        .collect();

    let mut seen = HashSet::new();
    let synonyms: Vec<String> = nouns
        .iter()
        .flat_map(|n| deps.synonyms.synonyms(n))
        .filter(|s| !existing.contains(s) && seen.insert(s.clone()))
        .collect();

    if synonyms.is_empty() {
        return ctx;
    }

    if ctx.has(Feature::DualQuery) {
        ctx.processed_queries.push(ProcessedQuery::new(
            synonyms.join(" "),
            QueryType::Synonym,
            "synonyms",
        ));
    } else if let Some(user) = ctx.primary_user_query_mut() {
        user.query = format!("{} {}", user.query, synonyms.join(" "));
    }
    ctx
}

async fn classify_intent(mut ctx: SearchContext, deps: &StageDeps<'_>) -> SearchContext {
    let Some(classifier) = deps.classifier else {
        return ctx;
    };
    let outcome =
        classify_with_fallback(classifier, &ctx.original_query, deps.classify_timeout).await;
    if !outcome.succeeded {
        return ctx;
    }

    if !outcome.classification.is_low_information_query {
        let terms = intent_terms(&outcome.classification, deps.nlp);
        if !terms.is_empty() {
            ctx.processed_queries.push(ProcessedQuery::new(
                terms.join(" "),
                QueryType::Intent,
                "classifier",
            ));
        }
    }
    ctx.intent_classification = Some(outcome.classification);
    ctx
}

/// Query terms derived from a classification: the primary intent plus
/// confident secondary intents, stemmed and stripped of generic nouns.
pub fn intent_terms(classification: &IntentClassification, nlp: &NlpEngine) -> Vec<String> {
    let labels = std::iter::once(classification.primary_intent.as_str()).chain(
        classification
            .top_intents
            .iter()
            .filter(|t| t.confidence >= SECONDARY_INTENT_MIN_CONFIDENCE)
            .map(|t| t.intent.as_str()),
    );

    let stems: Vec<String> = labels
        .flat_map(|label| label.split(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() >= MIN_STEM_CHARS)
        .map(|w| nlp.stem_word(w))
        .collect();

    let mut seen = HashSet::new();
    nlp.filter_generic_nouns(&stems)
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

fn filter_generic(mut ctx: SearchContext, deps: &StageDeps<'_>) -> SearchContext {
    ctx.processed_queries
        .retain(|q| !deps.nlp.is_all_generic(&q.query));
    ctx
}
