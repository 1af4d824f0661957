pub mod engine;
pub mod hybrid;
pub mod text_index;
pub mod vector;

pub use engine::SearchEngine;
