use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the profile snapshot and the full-text index are stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,
    /// Background index builder configuration
    pub indexer: IndexerConfig,
    /// Request-time retrieval and fusion constants
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai" or "ollama"
    pub provider: String,
    /// Base URL for the embedding API
    pub base_url: String,
    /// Model name for embeddings
    pub model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub dimensions: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Configuration for the staleness-driven rebuild pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Delay between a profile mutation and its rebuild event becoming visible
    /// to the batch trigger. Rapid successive edits collapse into one rebuild.
    pub rebuild_delay_secs: u64,
    /// Maximum number of rebuild events coalesced into one builder run.
    pub batch_max_size: usize,
    /// Maximum time to wait for a batch to fill after its first event.
    pub batch_timeout_secs: u64,
    /// Upper bound on candidates fetched per builder run.
    pub max_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum results returned to the caller
    pub result_limit: usize,
    /// Maximum candidates per ranked sub-retrieval in the hybrid pass
    pub candidate_limit: usize,
    /// RRF constant
    pub rrf_k: f32,
    /// A candidate passes on strength if any of these is met...
    pub min_semantic_similarity: f32,
    pub min_lexical_score: f32,
    pub min_fused_score: f32,
    /// ...and must also clear this sanity floor (semantic) or have any lexical score.
    pub floor_semantic_similarity: f32,
    /// Cache lifetime for default-mode responses
    pub cache_ttl_secs: u64,
    /// Cache lifetime for ai-mode responses
    pub ai_cache_ttl_secs: u64,
    pub stale_while_revalidate_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9000".to_string(),
            embedding: EmbeddingConfig::default(),
            indexer: IndexerConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            dimensions: 1536,
            timeout_secs: 30,
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            rebuild_delay_secs: 20,
            batch_max_size: 5,
            batch_timeout_secs: 30,
            max_candidates: 100,
        }
    }
}

impl IndexerConfig {
    pub fn rebuild_delay(&self) -> Duration {
        Duration::from_secs(self.rebuild_delay_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: 50,
            candidate_limit: 100,
            rrf_k: 60.0,
            min_semantic_similarity: 0.2,
            min_lexical_score: 0.05,
            min_fused_score: 0.015,
            floor_semantic_similarity: 0.1,
            cache_ttl_secs: 180,
            ai_cache_ttl_secs: 300,
            stale_while_revalidate_secs: 60,
        }
    }
}

impl SearchConfig {
    /// Rank assigned to a candidate missing from one sub-retrieval: one past the cap.
    pub fn absent_rank(&self) -> usize {
        self.candidate_limit + 1
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("PROFILE_SEARCH_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("PROFILE_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }

        // Embedding provider
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(url) = std::env::var("EMBEDDING_BASE_URL") {
            config.embedding.base_url = url;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            config.embedding.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.embedding.dimensions = d;
            }
        }
        if let Ok(val) = std::env::var("EMBEDDING_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.embedding.timeout_secs = v;
            }
        }

        // Index builder
        if let Ok(val) = std::env::var("INDEXER_REBUILD_DELAY_SECS") {
            if let Ok(v) = val.parse() {
                config.indexer.rebuild_delay_secs = v;
            }
        }
        if let Ok(val) = std::env::var("INDEXER_BATCH_MAX_SIZE") {
            if let Ok(v) = val.parse::<usize>() {
                config.indexer.batch_max_size = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("INDEXER_BATCH_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.indexer.batch_timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("INDEXER_MAX_CANDIDATES") {
            if let Ok(v) = val.parse::<usize>() {
                config.indexer.max_candidates = v.max(1);
            }
        }

        config
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.data_dir.join("profiles.json")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}
