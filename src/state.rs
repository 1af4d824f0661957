use std::sync::Arc;

use crate::config::Config;
use crate::indexer::{IndexBuilder, RebuildQueue, RebuildReceiver};
use crate::llm::{EmbeddingProvider, HttpEmbeddingClient};
use crate::profiles::{ProfileService, ProfileStore};
use crate::search::text_index::ProfileTextIndex;
use crate::search::SearchEngine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<ProfileStore>,
    pub text_index: Arc<ProfileTextIndex>,
    pub search: Arc<SearchEngine>,
    pub builder: Arc<IndexBuilder>,
    pub profiles: ProfileService,
}

impl AppState {
    /// Open the persisted store and index under `config.data_dir` and wire up
    /// the HTTP embedding client. The returned receiver feeds the batch trigger.
    pub fn new(config: Config) -> anyhow::Result<(Self, RebuildReceiver)> {
        // Ensure data directories exist
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(config.index_dir())?;

        let store = ProfileStore::open(&config.profiles_path(), config.embedding.dimensions)?;
        let text_index = ProfileTextIndex::open_or_create(&config.index_dir())?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(config.embedding.timeout_secs))
            .build()?;
        let embedder = HttpEmbeddingClient::new(http_client, config.embedding.clone());

        Ok(Self::from_parts(
            config,
            Arc::new(store),
            Arc::new(text_index),
            Arc::new(embedder),
        ))
    }

    pub fn from_parts(
        config: Config,
        store: Arc<ProfileStore>,
        text_index: Arc<ProfileTextIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> (Self, RebuildReceiver) {
        let (queue, rx) = RebuildQueue::new(config.indexer.rebuild_delay());

        let search = SearchEngine::new(
            store.clone(),
            text_index.clone(),
            embedder.clone(),
            config.search.clone(),
        );
        let builder = IndexBuilder::new(
            store.clone(),
            text_index.clone(),
            embedder,
            config.indexer.clone(),
        );
        let profiles = ProfileService::new(store.clone(), queue);

        let state = Self {
            config,
            store,
            text_index,
            search: Arc::new(search),
            builder: Arc::new(builder),
            profiles,
        };
        (state, rx)
    }
}
