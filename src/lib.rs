//! # directory-search
//!
//! Hybrid search orchestration for a multi-tenant service directory. One
//! user query fans out into several independently scored retrieval
//! strategies whose results are combined under a hot-reloadable weighting
//! scheme, with a per-document breakdown of where every point came from.
//!
//! ## Architecture
//!
//! A search request moves through four phases:
//!
//! ```text
//!                          ┌─────────────┐
//!                          │  User Query  │
//!                          └──────┬───────┘
//!                                 │
//!                    ┌────────────┴────────────┐
//!                    ▼                         ▼
//!           ┌────────────────┐       ┌──────────────────┐
//!           │   Embedding    │       │ Intent classifier │  Phase 1
//!           │ (vector|None)  │       │ (codes|fallback)  │  (joined)
//!           └───────┬────────┘       └────────┬─────────┘
//!                   └────────────┬────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │   Query Builder            │  WeightConfig
//!                  │ 3 KNN · 3 keyword · intent │◄─ snapshot
//!                  │ + shared filters           │
//!                  └─────────────┬─────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │  One batched _msearch      │  Phase 2
//!                  └─────────────┬─────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │  Combiner                  │
//!                  │  Σ score × weight per doc  │
//!                  │  + geospatial decay        │
//!                  │  sort: score ↓, id ↑       │
//!                  └─────────────┬─────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │  Rerank page (optional)    │  Phase 3
//!                  └─────────────┬─────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │  Assemble: strip vectors,  │  Phase 4
//!                  │  cursor, timings, trace    │
//!                  └───────────────────────────┘
//! ```
//!
//! Suggestions run the versioned enhancement pipeline (code detection,
//! stemming, synonyms, intent terms, generic-noun filter) and search the
//! taxonomy index with the result.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for the backend, indexes and adapters
//! - [`error`] - `SearchError` and its HTTP mapping
//! - [`models`] - Request/response wire types
//! - [`weights`] - Weight snapshots, bounded validation, per-request overrides, hot reload
//! - [`nlp`] - Noun extraction, Snowball stemming, generic-noun stoplist
//! - [`pipeline`] - Versioned query enhancement stages and the strategy selector
//! - [`upstream`] - Embedding, intent and rerank clients with timeout fallbacks
//! - [`search::query_builder`] - Weighted retrieval clauses and shared filters
//! - [`search::executor`] - Batched `_msearch` execution with per-clause timing
//! - [`search::combiner`] - Cross-strategy dedup and weighted-sum scoring
//! - [`search::geo`] - Haversine distance and Gaussian proximity decay
//! - [`search::cursor`] - `search_after` pagination boundaries
//! - [`orchestrator`] - The search request state machine
//! - [`suggest`] - Taxonomy suggestions for API versions 1-3
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state wired from configuration

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod nlp;
pub mod orchestrator;
pub mod pipeline;
pub mod search;
pub mod state;
pub mod suggest;
pub mod upstream;
pub mod weights;
