//! Taxonomy suggestions driven by the versioned enhancement pipeline.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{SearchError, SearchResult};
use crate::models::{
    SuggestRequest, SuggestResponse, Suggestion, MAX_SUGGEST_PAGE, SUGGEST_PAGE_SIZE,
};
use crate::orchestrator::index_name;
use crate::pipeline::{ApiVersion, Feature, Pipeline, ProcessedQuery, QueryType, SearchContext};
use crate::search::query_builder::{multi_match, wrap};
use crate::search::{combine, execute_batch, SearchBackend, StrategyClause};

/// How much each query source counts when dual-query results are combined.
pub fn query_type_weight(kind: QueryType) -> f64 {
    match kind {
        QueryType::User => 1.0,
        QueryType::Intent => 0.8,
        QueryType::Synonym => 0.6,
    }
}

pub struct Suggester {
    pipeline: Arc<Pipeline>,
    backend: Arc<dyn SearchBackend>,
    index_prefix: String,
}

impl Suggester {
    pub fn new(
        pipeline: Arc<Pipeline>,
        backend: Arc<dyn SearchBackend>,
        index_prefix: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            backend,
            index_prefix: index_prefix.into(),
        }
    }

    pub async fn suggest(
        &self,
        version: ApiVersion,
        req: SuggestRequest,
    ) -> SearchResult<SuggestResponse> {
        let start = Instant::now();
        let input = req
            .code
            .as_deref()
            .or(req.query.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SearchError::validation("query or code is required"))?
            .to_string();
        let page = req.page.max(1);
        if page > MAX_SUGGEST_PAGE {
            return Err(SearchError::validation(format!(
                "page must be at most {MAX_SUGGEST_PAGE}, got {page}"
            )));
        }
        let index = index_name(&self.index_prefix, &req.lang)?;

        let mut ctx = self
            .pipeline
            .run(version, &input, req.disable_intent_classification)
            .await;
        if ctx.processed_queries.is_empty() {
            // Everything was generic: search the text as typed.
            ctx.processed_queries
                .push(ProcessedQuery::new(input.clone(), QueryType::User, "original"));
        }
        let fields: Vec<&str> = ctx.fields.iter().map(String::as_str).collect();

        let (suggestions, total) = if ctx.has(Feature::DualQuery) {
            self.dual_query(&ctx, &fields, &index, page).await?
        } else {
            self.merged_query(&ctx, &fields, &index, page).await?
        };

        tracing::info!(
            version = %version,
            query = %input,
            suggestions = suggestions.len(),
            "suggest complete"
        );
        Ok(SuggestResponse {
            took: start.elapsed().as_millis() as u64,
            page,
            total,
            suggestions,
            context: ctx,
        })
    }

    async fn merged_query(
        &self,
        ctx: &SearchContext,
        fields: &[&str],
        index: &str,
        page: usize,
    ) -> SearchResult<(Vec<Suggestion>, u64)> {
        let mut body = wrap(multi_match(&ctx.merged_query(), fields), &[], SUGGEST_PAGE_SIZE);
        body["from"] = Value::from((page - 1) * SUGGEST_PAGE_SIZE);
        let clause = StrategyClause {
            strategy: "suggest".to_string(),
            weight: 1.0,
            body,
        };
        let mut results = execute_batch(self.backend.as_ref(), index, &[clause])
            .await
            .map_err(|e| SearchError::Backend(format!("{e:#}")))?;
        let result = results
            .pop()
            .ok_or_else(|| SearchError::Internal("empty suggest result".to_string()))?;

        let suggestions = result
            .hits
            .into_iter()
            .map(|h| Suggestion {
                code: string_field(&h.source, "code"),
                name: string_field(&h.source, "name"),
                id: h.doc_id,
                score: h.score,
                sources: Vec::new(),
            })
            .collect();
        Ok((suggestions, result.total))
    }

    /// One clause per processed query, fused with per-source weights.
    async fn dual_query(
        &self,
        ctx: &SearchContext,
        fields: &[&str],
        index: &str,
        page: usize,
    ) -> SearchResult<(Vec<Suggestion>, u64)> {
        let window = page * SUGGEST_PAGE_SIZE;
        let clauses: Vec<StrategyClause> = ctx
            .processed_queries
            .iter()
            .map(|q| StrategyClause {
                strategy: q.strategy_name(),
                weight: query_type_weight(q.kind),
                body: wrap(multi_match(&q.query, fields), &[], window),
            })
            .collect();
        let results = execute_batch(self.backend.as_ref(), index, &clauses)
            .await
            .map_err(|e| SearchError::Backend(format!("{e:#}")))?;

        let combined = combine(&results, None);
        let total = combined.len() as u64;
        let suggestions = combined
            .into_iter()
            .skip((page - 1) * SUGGEST_PAGE_SIZE)
            .take(SUGGEST_PAGE_SIZE)
            .map(|h| Suggestion {
                code: string_field(&h.source, "code"),
                name: string_field(&h.source, "name"),
                id: h.doc_id,
                score: h.total_score,
                sources: h.sources,
            })
            .collect();
        Ok((suggestions, total))
    }
}

fn string_field(source: &Value, field: &str) -> Option<String> {
    source.get(field).and_then(Value::as_str).map(str::to_string)
}
