use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for the per-clause candidate window.
pub const MAX_CANDIDATE_POOL: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    pub opensearch: OpenSearchConfig,
    pub index: IndexConfig,
    pub embedding: AdapterConfig,
    pub intent: AdapterConfig,
    pub reranker: AdapterConfig,
    /// JSON weight document watched for changes. Defaults apply when unset.
    pub weights_path: Option<PathBuf>,
    pub weights_reload_secs: u64,
    /// JSON object of `{"word": ["synonym", ...]}`.
    pub synonyms_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSearchConfig {
    pub url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Resource index prefix; requests search `{prefix}_{lang}`.
    pub resource_prefix: String,
    /// Taxonomy index prefix used by suggestions.
    pub taxonomy_prefix: String,
    /// Hits fetched per strategy before combination.
    pub candidate_pool: usize,
}

/// An optional external AI service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Endpoint URL. If None, the adapter is skipped and its fallback used.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl AdapterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            opensearch: OpenSearchConfig {
                url: "http://localhost:9200".to_string(),
                username: None,
                password: None,
            },
            index: IndexConfig {
                resource_prefix: "resources".to_string(),
                taxonomy_prefix: "taxonomies".to_string(),
                candidate_pool: 300,
            },
            embedding: AdapterConfig::default(),
            intent: AdapterConfig::default(),
            reranker: AdapterConfig::default(),
            weights_path: None,
            weights_reload_secs: 5,
            synonyms_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("DIRECTORY_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }

        // OpenSearch
        if let Some(url) = var("OPENSEARCH_URL") {
            config.opensearch.url = url;
        }
        config.opensearch.username = var("OPENSEARCH_USERNAME");
        config.opensearch.password = var("OPENSEARCH_PASSWORD");
        if let Some(prefix) = var("SEARCH_INDEX_PREFIX") {
            config.index.resource_prefix = prefix;
        }
        if let Some(prefix) = var("TAXONOMY_INDEX_PREFIX") {
            config.index.taxonomy_prefix = prefix;
        }
        if let Some(v) = var("SEARCH_CANDIDATE_POOL").and_then(|v| v.parse::<usize>().ok()) {
            config.index.candidate_pool = v.clamp(1, MAX_CANDIDATE_POOL);
        }

        // Adapters
        config.embedding.url = var("EMBEDDING_URL").filter(|u| !u.is_empty());
        if let Some(v) = var("EMBEDDING_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.embedding.timeout_secs = v;
        }
        config.intent.url = var("INTENT_CLASSIFIER_URL").filter(|u| !u.is_empty());
        if let Some(v) = var("INTENT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.intent.timeout_secs = v;
        }
        config.reranker.url = var("RERANKER_URL").filter(|u| !u.is_empty());
        if let Some(v) = var("RERANKER_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            config.reranker.timeout_secs = v.min(30); // Cap at 30s
        }

        // Weights and synonyms
        config.weights_path = var("WEIGHTS_PATH").map(PathBuf::from);
        if let Some(v) = var("WEIGHTS_RELOAD_SECS").and_then(|v| v.parse::<u64>().ok()) {
            config.weights_reload_secs = v.max(1);
        }
        config.synonyms_path = var("SYNONYMS_PATH").map(PathBuf::from);

        config
    }
}
