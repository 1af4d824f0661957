use uuid::Uuid;

/// A profile ranked by embedding proximity to a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub user_id: Uuid,
    /// `1 - cosine_distance`
    pub similarity: f32,
}

/// Rank embeddings nearest-first by cosine distance to `query` and keep the
/// top `limit`. Entries whose dimension differs from the query, or that hold
/// non-finite components, score zero.
pub fn nearest<'a, I>(query: &[f32], candidates: I, limit: usize) -> Vec<VectorHit>
where
    I: IntoIterator<Item = (Uuid, &'a [f32])>,
{
    let mut scored: Vec<VectorHit> = candidates
        .into_iter()
        .map(|(user_id, embedding)| VectorHit {
            user_id,
            similarity: 1.0 - cosine_distance(query, embedding),
        })
        .collect();

    // Sort descending by similarity (ascending distance)
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(limit);
    scored
}

/// Cosine distance in `[0, 2]`, matching a `<=>` vector operator.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    let similarity = dot / denom;
    if denom == 0.0 || !similarity.is_finite() {
        0.0
    } else {
        similarity
    }
}
