//! Test doubles shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::ProviderError;
use crate::llm::EmbeddingProvider;

/// Deterministic bag-of-words embedder that counts its calls. Each distinct
/// lowercase word gets its own dimension until `dim` runs out, so texts with
/// no words in common are orthogonal.
pub struct StubEmbedder {
    dim: usize,
    vocabulary: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
    fail: AtomicBool,
    /// Texts containing this word come back one dimension too long
    wrong_dim_marker: Option<String>,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vocabulary: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            wrong_dim_marker: None,
        }
    }

    pub fn with_wrong_dim_marker(dim: usize, marker: &str) -> Self {
        Self {
            wrong_dim_marker: Some(marker.to_string()),
            ..Self::new(dim)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dim];
        let mut vocabulary = self.vocabulary.lock();
        for word in text.split_whitespace() {
            let next = vocabulary.len();
            let slot = *vocabulary.entry(word.to_lowercase()).or_insert(next);
            v[slot % self.dim] += 1.0;
        }
        if let Some(marker) = &self.wrong_dim_marker {
            if text.contains(marker.as_str()) {
                v.push(0.0);
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                status: 503,
                body: "stub provider unavailable".to_string(),
            });
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}
