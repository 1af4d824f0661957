use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use profile_search::api;
use profile_search::config::Config;
use profile_search::indexer::{run_batch_trigger, BatchTrigger};
use profile_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "Embedding provider: {} ({}, {} dims)",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimensions
    );

    let (state, rebuild_rx) = AppState::new(config.clone())?;

    let trigger = BatchTrigger::from_config(&config.indexer);
    tokio::spawn(run_batch_trigger(
        rebuild_rx,
        Arc::clone(&state.builder),
        trigger,
    ));

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
