use std::collections::HashMap;
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::search::text_index::LexicalHit;
use crate::search::vector::VectorHit;

/// A candidate scored by Reciprocal Rank Fusion over the semantic and
/// lexical sub-rankings.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub user_id: Uuid,
    /// 1-based ranks; `None` when absent from that sub-ranking
    pub semantic_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
    pub semantic_similarity: f32,
    pub lexical_score: f32,
    pub fused_score: f32,
}

/// `1 / (k + rank)` for a 1-based rank.
pub fn rrf_term(k: f32, rank: usize) -> f32 {
    1.0 / (k + rank as f32)
}

/// Two-tier relevance gate: a strong showing in either signal (or a decent
/// fused score), and never a candidate with no lexical match and
/// near-zero similarity.
pub fn passes_relevance_floor(hit: &FusedHit, config: &SearchConfig) -> bool {
    let strong = hit.semantic_similarity >= config.min_semantic_similarity
        || hit.lexical_score > config.min_lexical_score
        || hit.fused_score >= config.min_fused_score;
    let sane = hit.semantic_similarity >= config.floor_semantic_similarity || hit.lexical_score > 0.0;
    strong && sane
}

/// Full outer join of both sub-rankings on user id, RRF scoring, gating and
/// ordering.
///
/// Each list is capped at `candidate_limit`; a user missing from one list
/// takes `candidate_limit + 1` as that rank instead of contributing zero.
/// Results are ordered by fused score, then semantic similarity, then lexical
/// score, and capped at `result_limit`.
pub fn reciprocal_rank_fusion(
    semantic: &[VectorHit],
    lexical: &[LexicalHit],
    config: &SearchConfig,
) -> Vec<FusedHit> {
    let cap = config.candidate_limit;
    let absent = config.absent_rank();
    let k = config.rrf_k;

    let mut joined: HashMap<Uuid, FusedHit> = HashMap::new();

    for (i, hit) in semantic.iter().take(cap).enumerate() {
        let entry = joined.entry(hit.user_id).or_insert_with(|| empty_hit(hit.user_id));
        if entry.semantic_rank.is_none() {
            entry.semantic_rank = Some(i + 1);
            entry.semantic_similarity = hit.similarity;
        }
    }

    for (i, hit) in lexical.iter().take(cap).enumerate() {
        let entry = joined.entry(hit.user_id).or_insert_with(|| empty_hit(hit.user_id));
        if entry.lexical_rank.is_none() {
            entry.lexical_rank = Some(i + 1);
            entry.lexical_score = hit.score;
        }
    }

    let mut results: Vec<FusedHit> = joined
        .into_values()
        .map(|mut hit| {
            hit.fused_score = rrf_term(k, hit.semantic_rank.unwrap_or(absent))
                + rrf_term(k, hit.lexical_rank.unwrap_or(absent));
            hit
        })
        .filter(|hit| passes_relevance_floor(hit, config))
        .collect();

    results.sort_by(|a, b| {
        b.fused_score
            .total_cmp(&a.fused_score)
            .then(b.semantic_similarity.total_cmp(&a.semantic_similarity))
            .then(b.lexical_score.total_cmp(&a.lexical_score))
    });
    results.truncate(config.result_limit);
    results
}

fn empty_hit(user_id: Uuid) -> FusedHit {
    FusedHit {
        user_id,
        semantic_rank: None,
        lexical_rank: None,
        semantic_similarity: 0.0,
        lexical_score: 0.0,
        fused_score: 0.0,
    }
}
