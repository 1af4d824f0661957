//! # profile-search
//!
//! A Rust web service for discovering people by what their profiles say.
//! Profile edits mark a user stale; a background builder rebuilds that
//! user's searchable text, full-text document and embedding; queries are
//! answered lexically first and escalate to hybrid semantic + lexical
//! retrieval only when nothing matches literally.
//!
//! ## Architecture
//!
//! Writes and reads are decoupled through two staleness flags per user:
//!
//! ```text
//!   ┌──────────────────┐   mark dirty    ┌──────────────────────┐
//!   │  Profile edit    │───────────────►│ ProfileStore (flags) │
//!   └────────┬─────────┘                 └──────────┬───────────┘
//!            │ search/build (delayed 20s)           │ stale candidates
//!            ▼                                      ▼
//!   ┌──────────────────┐  ≤5 events/30s  ┌──────────────────────┐
//!   │  RebuildQueue    │───────────────►│    IndexBuilder      │
//!   └──────────────────┘                 │  text → embed/index  │
//!                                        └──────────┬───────────┘
//!                                                   │ clear flags
//!                                                   ▼
//!   ┌──────────────────┐                 ┌──────────────────────┐
//!   │  GET /api/search │───────────────►│    SearchEngine      │
//!   └──────────────────┘                 │ lexical ─► hybrid RRF│
//!                                        └──────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, embeddings, indexer and search
//! - [`error`] - Typed errors for the provider, store, builder, queue and search
//! - [`models`] - Profile records, staleness state and request/response types
//! - [`profiles`] - Profile datastore and mutation use cases (the only flag writers)
//! - [`indexer`] - Searchable text derivation, rebuild event queue, batch trigger and builder
//! - [`llm::embeddings`] - Batch embedding generation via Ollama or OpenAI-compatible APIs
//! - [`search::text_index`] - Full-text index powered by tantivy
//! - [`search::vector`] - Cosine nearest-neighbour over stored profile embeddings
//! - [`search::hybrid`] - Reciprocal Rank Fusion with a two-tier relevance gate
//! - [`search::engine`] - Lexical-first query pipeline with hybrid escalation
//! - [`api`] - Axum HTTP handlers for profiles, search and index maintenance
//! - [`state`] - Shared application state wiring the components together

pub mod api;
pub mod config;
pub mod error;
pub mod indexer;
pub mod llm;
pub mod models;
pub mod profiles;
pub mod search;
pub mod state;

#[cfg(test)]
mod test_utils;
