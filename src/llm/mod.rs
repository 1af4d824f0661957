pub mod embeddings;

pub use embeddings::{EmbeddingProvider, HttpEmbeddingClient};
