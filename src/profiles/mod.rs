pub mod service;
pub mod store;

pub use service::ProfileService;
pub use store::{ProfileStore, RebuildCandidate};
