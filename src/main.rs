use tracing_subscriber::EnvFilter;

use directory_search::api;
use directory_search::config::Config;
use directory_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Search backend: {} (resources: {}_*, taxonomies: {}_*)",
        config.opensearch.url,
        config.index.resource_prefix,
        config.index.taxonomy_prefix
    );
    for (name, adapter) in [
        ("embedding", &config.embedding),
        ("intent classifier", &config.intent),
        ("reranker", &config.reranker),
    ] {
        match &adapter.url {
            Some(url) => tracing::info!("{name}: {url} (timeout {}s)", adapter.timeout_secs),
            None => tracing::info!("{name}: not configured, fallback only"),
        }
    }

    let state = AppState::new(config.clone())?;
    let _reloader = state.spawn_weight_reloader();

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
