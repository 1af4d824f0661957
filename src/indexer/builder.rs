use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::IndexerConfig;
use crate::error::{BuildError, ProviderError};
use crate::indexer::text::build_searchable_text;
use crate::llm::EmbeddingProvider;
use crate::models::BuildReport;
use crate::profiles::ProfileStore;
use crate::search::text_index::ProfileTextIndex;

/// A candidate with its derived text, ready for either rebuild step.
struct Prepared {
    user_id: Uuid,
    revision: u64,
    text: String,
    embeddings_stale: bool,
    search_vector_stale: bool,
}

/// Materializes embeddings and text-index documents for stale users.
///
/// Runs may overlap. Every artifact is tagged with the profile revision it
/// was built from and dropped if that revision has been superseded, so the
/// newest edit always wins and concurrent runs converge.
pub struct IndexBuilder {
    store: Arc<ProfileStore>,
    text_index: Arc<ProfileTextIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: IndexerConfig,
}

impl IndexBuilder {
    pub fn new(
        store: Arc<ProfileStore>,
        text_index: Arc<ProfileTextIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            text_index,
            embedder,
            config,
        }
    }

    /// Rebuild the users named in `requested` and any other stale users.
    ///
    /// An embedding provider failure abandons the embedding step for the
    /// whole batch (no flag is cleared) but the text step still runs; the
    /// provider error is returned afterwards.
    pub async fn run(&self, requested: &[Uuid]) -> Result<BuildReport, BuildError> {
        let requested: HashSet<Uuid> = requested.iter().copied().collect();
        let candidates = self
            .store
            .fetch_candidates(&requested, self.config.max_candidates);

        if candidates.is_empty() {
            tracing::debug!(requested = requested.len(), "no stale profiles to rebuild");
            return Ok(BuildReport::default());
        }

        let prepared: Vec<Prepared> = candidates
            .iter()
            .map(|c| Prepared {
                user_id: c.profile.id,
                revision: c.revision,
                text: build_searchable_text(&c.profile),
                embeddings_stale: c.profile.search.embeddings_stale,
                search_vector_stale: c.profile.search.search_vector_stale,
            })
            .collect();

        let mut report = BuildReport {
            candidates: prepared.len(),
            ..BuildReport::default()
        };

        let provider_error = match self.rebuild_embeddings(&prepared).await {
            Ok(updated) => {
                report.embeddings_updated = updated;
                None
            }
            Err(e) => Some(e),
        };

        report.text_indexes_updated = match self.rebuild_text_index(&prepared).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(provider_error) = &provider_error {
                    tracing::error!(
                        candidates = report.candidates,
                        error = %provider_error,
                        "embedding step aborted; affected profiles stay stale"
                    );
                }
                return Err(e);
            }
        };

        if let Some(e) = provider_error {
            tracing::error!(
                candidates = report.candidates,
                text_indexes_updated = report.text_indexes_updated,
                error = %e,
                "embedding step aborted; affected profiles stay stale"
            );
            return Err(BuildError::Provider(e));
        }

        tracing::info!(
            candidates = report.candidates,
            embeddings_updated = report.embeddings_updated,
            text_indexes_updated = report.text_indexes_updated,
            "search index build complete"
        );
        Ok(report)
    }

    /// Rebuild every stale user, one candidate page at a time, until a page
    /// comes back short or makes no progress. Rebuild events do not survive
    /// a restart, so this runs once at startup to pick up users that were
    /// left dirty.
    pub async fn sweep_stale(&self) -> Result<BuildReport, BuildError> {
        let mut total = BuildReport::default();
        loop {
            let report = self.run(&[]).await?;
            total.candidates += report.candidates;
            total.embeddings_updated += report.embeddings_updated;
            total.text_indexes_updated += report.text_indexes_updated;

            let progressed = report.embeddings_updated + report.text_indexes_updated > 0;
            if report.candidates < self.config.max_candidates || !progressed {
                break;
            }
        }
        Ok(total)
    }

    async fn rebuild_embeddings(&self, prepared: &[Prepared]) -> Result<usize, ProviderError> {
        let stale: Vec<&Prepared> = prepared.iter().filter(|p| p.embeddings_stale).collect();
        if stale.is_empty() {
            return Ok(0);
        }

        // Users with nothing to embed get their vector cleared, no provider call
        let (blank, to_embed): (Vec<&Prepared>, Vec<&Prepared>) =
            stale.into_iter().partition(|p| p.text.is_empty());

        let vectors = if to_embed.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = to_embed.iter().map(|p| p.text.clone()).collect();
            self.embedder.embed_batch(&texts).await?
        };

        let writes = to_embed
            .iter()
            .zip(vectors.into_iter().map(Some))
            .chain(blank.iter().map(|p| (p, None)));

        let mut updated = 0;
        for (p, embedding) in writes {
            match self.store.write_embedding(&p.user_id, embedding, p.revision) {
                Ok(true) => updated += 1,
                Ok(false) => tracing::debug!(
                    user_id = %p.user_id,
                    "profile edited during rebuild; embedding superseded"
                ),
                Err(e) => tracing::warn!(
                    user_id = %p.user_id,
                    error = %e,
                    "failed to persist embedding; will retry on next run"
                ),
            }
        }
        Ok(updated)
    }

    async fn rebuild_text_index(&self, prepared: &[Prepared]) -> Result<usize, BuildError> {
        let stale: Vec<&Prepared> = prepared.iter().filter(|p| p.search_vector_stale).collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let docs: Vec<(Uuid, String)> = stale.iter().map(|p| (p.user_id, p.text.clone())).collect();
        let observed: HashMap<Uuid, u64> = stale.iter().map(|p| (p.user_id, p.revision)).collect();
        let index = self.text_index.clone();
        let store = self.store.clone();
        // A document built from a superseded revision must not replace one
        // a newer run may already have committed
        let is_current = move |id: &Uuid| store.current_revision(id) == observed.get(id).copied();
        let committed: HashSet<Uuid> =
            tokio::task::spawn_blocking(move || index.index_profiles(&docs, is_current))
                .await
                .context("text indexing task failed")??
                .into_iter()
                .collect();

        let mut updated = 0;
        for p in stale.iter().filter(|p| committed.contains(&p.user_id)) {
            match self
                .store
                .write_search_text(&p.user_id, p.text.clone(), p.revision)
            {
                Ok(true) => updated += 1,
                Ok(false) => tracing::debug!(
                    user_id = %p.user_id,
                    "profile edited during rebuild; search text superseded"
                ),
                Err(e) => tracing::warn!(
                    user_id = %p.user_id,
                    error = %e,
                    "failed to persist search text; will retry on next run"
                ),
            }
        }
        Ok(updated)
    }
}
