use anyhow::Context;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::llm::EmbeddingProvider;
use crate::models::{SearchMode, SearchResult};
use crate::profiles::ProfileStore;
use crate::search::hybrid::reciprocal_rank_fusion;
use crate::search::text_index::{LexicalHit, ProfileTextIndex};

/// Request-time retrieval over the rebuilt artifacts.
///
/// ```text
///   query ──► lexical pass ──► hits? ──yes──► results (lexical score)
///                                │
///                                no
///                                ▼
///              embed query ──► nearest by cosine ─┐
///              lexical (capped) ──────────────────┼─► RRF + gate ──► results (fused score)
/// ```
///
/// Search never reads the staleness flags: a user whose artifacts are
/// being rebuilt is served from whatever was last written.
pub struct SearchEngine {
    store: Arc<ProfileStore>,
    text_index: Arc<ProfileTextIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(
        store: Arc<ProfileStore>,
        text_index: Arc<ProfileTextIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            text_index,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub async fn search(
        &self,
        query: &str,
        mode: SearchMode,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::Validation("Query is required".to_string()));
        }

        let lexical = self.lexical(query, self.config.result_limit).await?;
        let results = self.hydrate(lexical.iter().map(|h| (h.user_id, h.score)));
        if !results.is_empty() {
            tracing::debug!(mode = ?mode, results = results.len(), "lexical pass answered");
            return Ok(results);
        }

        let results = self.hybrid(query).await?;
        tracing::debug!(mode = ?mode, results = results.len(), "hybrid pass answered");
        Ok(results)
    }

    async fn hybrid(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let query_vec = self.embedder.embed_query(query).await?;

        let semantic = self
            .store
            .nearest_by_embedding(&query_vec, self.config.candidate_limit);
        let lexical = self.lexical(query, self.config.candidate_limit).await?;

        let fused = reciprocal_rank_fusion(&semantic, &lexical, &self.config);
        tracing::debug!(
            semantic = semantic.len(),
            lexical = lexical.len(),
            fused = fused.len(),
            "fusion complete"
        );
        Ok(self.hydrate(fused.iter().map(|h| (h.user_id, h.fused_score))))
    }

    async fn lexical(&self, query: &str, limit: usize) -> Result<Vec<LexicalHit>, SearchError> {
        let index = self.text_index.clone();
        let q = query.to_string();
        let hits = tokio::task::spawn_blocking(move || index.search(&q, limit))
            .await
            .context("lexical search task failed")??;
        Ok(hits)
    }

    /// Attach profile summaries in ranked order, skipping ids that no longer
    /// resolve to a user.
    fn hydrate(&self, ranked: impl Iterator<Item = (Uuid, f32)>) -> Vec<SearchResult> {
        let ranked: Vec<(Uuid, f32)> = ranked.collect();
        let ids: Vec<Uuid> = ranked.iter().map(|(id, _)| *id).collect();
        let profiles = self.store.get_many(&ids);

        ranked
            .iter()
            .filter_map(|(id, score)| {
                profiles
                    .iter()
                    .find(|p| &p.id == id)
                    .map(|p| SearchResult::from_profile(p, *score))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use crate::indexer::IndexBuilder;
    use crate::models::{NewProfile, ProfileUpdate};
    use crate::profiles::ProfileService;
    use crate::indexer::RebuildQueue;
    use crate::test_utils::StubEmbedder;
    use std::time::Duration;

    const DIM: usize = 32;

    struct Fixture {
        store: Arc<ProfileStore>,
        embedder: Arc<StubEmbedder>,
        builder: IndexBuilder,
        engine: SearchEngine,
        service: ProfileService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(ProfileStore::in_memory(DIM));
        let text_index = Arc::new(ProfileTextIndex::in_memory().unwrap());
        let embedder = Arc::new(StubEmbedder::new(DIM));
        let builder = IndexBuilder::new(
            store.clone(),
            text_index.clone(),
            embedder.clone(),
            IndexerConfig::default(),
        );
        let engine = SearchEngine::new(
            store.clone(),
            text_index,
            embedder.clone(),
            SearchConfig::default(),
        );
        let (queue, _rx) = RebuildQueue::new(Duration::from_secs(20));
        let service = ProfileService::new(store.clone(), queue);
        Fixture {
            store,
            embedder,
            builder,
            engine,
            service,
        }
    }

    fn add_user(f: &Fixture, name: &str, username: &str, title: &str) -> Uuid {
        let p = f
            .service
            .create_profile(NewProfile {
                name: name.to_string(),
                username: username.to_string(),
                title: None,
                location: None,
                image: None,
            })
            .unwrap();
        f.service
            .update_profile(
                &p.id,
                ProfileUpdate {
                    title: Some(title.to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();
        p.id
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let f = fixture();
        let err = f.engine.search("   ", SearchMode::Default).await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_lexical_hit_skips_embedding() {
        let f = fixture();
        let alice = add_user(&f, "Alice Smith", "alice", "Software Engineer");
        add_user(&f, "Bob Lee", "bob", "Poet");
        f.builder.run(&[]).await.unwrap();
        let calls_after_build = f.embedder.calls();

        let results = f.engine.search("engineer", SearchMode::Default).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, alice);
        assert!(results[0].score > 0.0 && results[0].score < 1.0);
        assert_eq!(f.embedder.calls(), calls_after_build);
    }

    #[tokio::test]
    async fn test_no_lexical_hit_escalates_to_hybrid() {
        let f = fixture();
        let bob = add_user(&f, "Bob Lee", "bob", "Poet");
        f.builder.run(&[]).await.unwrap();
        let calls_after_build = f.embedder.calls();

        // "poet writer" never matches as a whole (AND semantics), but its
        // embedding shares the "poet" dimension with Bob's profile
        let results = f.engine.search("poet writer", SearchMode::Default).await.unwrap();
        assert_eq!(f.embedder.calls(), calls_after_build + 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, bob);
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn test_ai_mode_ranks_like_default() {
        let f = fixture();
        add_user(&f, "Alice Smith", "alice", "Software Engineer");
        f.builder.run(&[]).await.unwrap();

        let default = f.engine.search("software", SearchMode::Default).await.unwrap();
        let ai = f.engine.search("software", SearchMode::Ai).await.unwrap();
        assert_eq!(default, ai);
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let f = fixture();
        add_user(&f, "Alice Smith", "alice", "Software Engineer");
        f.builder.run(&[]).await.unwrap();
        f.embedder.set_failing(true);

        let err = f.engine.search("gardener", SearchMode::Default).await.unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));
    }

    #[tokio::test]
    async fn test_stale_user_served_from_last_artifacts() {
        let f = fixture();
        let alice = add_user(&f, "Alice Smith", "alice", "Software Engineer");
        f.builder.run(&[]).await.unwrap();

        f.service
            .update_profile(
                &alice,
                ProfileUpdate {
                    title: Some("Gardener".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();
        assert!(f.store.get(&alice).unwrap().search.search_vector_stale);

        let results = f.engine.search("engineer", SearchMode::Default).await.unwrap();
        assert_eq!(results[0].id, alice);
    }

    #[tokio::test]
    async fn test_unrelated_query_returns_nothing() {
        let f = fixture();
        add_user(&f, "Alice Smith", "alice", "Software Engineer");
        f.builder.run(&[]).await.unwrap();

        let results = f.engine.search("xylophone", SearchMode::Default).await.unwrap();
        assert!(results.is_empty());
    }
}
