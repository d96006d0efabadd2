use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::nlp::NlpEngine;
use crate::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::pipeline::{MapSynonyms, Pipeline, SynonymSource};
use crate::search::{OpenSearchBackend, SearchBackend};
use crate::suggest::Suggester;
use crate::upstream::{
    Embedder, HttpEmbedder, HttpIntentClassifier, HttpReranker, IntentClassifier, Reranker,
};
use crate::weights::{WeightConfig, WeightStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub weights: Arc<WeightStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub suggester: Arc<Suggester>,
}

impl AppState {
    /// Wire every component from configuration. The weight reloader is not
    /// started here; see [`AppState::spawn_weight_reloader`].
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;

        let weights = Arc::new(match &config.weights_path {
            Some(path) => WeightStore::with_source(path),
            None => WeightStore::new(WeightConfig::default()),
        });

        let synonyms: Arc<dyn SynonymSource> = match &config.synonyms_path {
            Some(path) => {
                let s = MapSynonyms::from_file(path)?;
                tracing::info!("Loaded {} synonym entries from {}", s.len(), path.display());
                Arc::new(s)
            }
            None => Arc::new(MapSynonyms::empty()),
        };

        let mut backend = OpenSearchBackend::new(http_client.clone(), &config.opensearch.url);
        if let Some(user) = &config.opensearch.username {
            backend = backend.with_basic_auth(
                user.clone(),
                config.opensearch.password.clone().unwrap_or_default(),
            );
        }
        let backend: Arc<dyn SearchBackend> = Arc::new(backend);

        let embedder: Option<Arc<dyn Embedder>> = config.embedding.url.as_ref().map(|url| {
            Arc::new(HttpEmbedder::new(
                http_client.clone(),
                url,
                config.embedding.timeout(),
            )) as Arc<dyn Embedder>
        });
        let classifier: Option<Arc<dyn IntentClassifier>> = config.intent.url.as_ref().map(|url| {
            Arc::new(HttpIntentClassifier::new(
                http_client.clone(),
                url,
                config.intent.timeout(),
            )) as Arc<dyn IntentClassifier>
        });
        let reranker: Option<Arc<dyn Reranker>> = config.reranker.url.as_ref().map(|url| {
            Arc::new(HttpReranker::new(
                http_client.clone(),
                url,
                config.reranker.timeout(),
            )) as Arc<dyn Reranker>
        });

        let pipeline = Arc::new(Pipeline::new(
            Arc::new(NlpEngine::new()),
            synonyms,
            classifier.clone(),
            config.intent.timeout(),
        ));

        let settings = OrchestratorSettings {
            index_prefix: config.index.resource_prefix.clone(),
            candidate_pool: config.index.candidate_pool,
            embed_timeout: config.embedding.timeout(),
            classify_timeout: config.intent.timeout(),
            rerank_timeout: config.reranker.timeout(),
        };
        let mut orchestrator =
            Orchestrator::new(weights.clone(), pipeline.clone(), backend.clone(), settings);
        if let Some(e) = embedder {
            orchestrator = orchestrator.with_embedder(e);
        }
        if let Some(c) = classifier {
            orchestrator = orchestrator.with_classifier(c);
        }
        if let Some(r) = reranker {
            orchestrator = orchestrator.with_reranker(r);
        }

        let suggester = Suggester::new(pipeline, backend, config.index.taxonomy_prefix.clone());

        Ok(Self {
            config: Arc::new(config),
            weights,
            orchestrator: Arc::new(orchestrator),
            suggester: Arc::new(suggester),
        })
    }

    /// Start polling the weight source, if one is configured.
    pub fn spawn_weight_reloader(&self) -> Option<tokio::task::JoinHandle<()>> {
        self.weights.source()?;
        let every = Duration::from_secs(self.config.weights_reload_secs);
        Some(self.weights.clone().spawn_reloader(every))
    }
}
