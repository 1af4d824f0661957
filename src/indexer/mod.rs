pub mod builder;
pub mod queue;
pub mod text;

pub use builder::IndexBuilder;
pub use queue::{run_batch_trigger, BatchTrigger, RebuildQueue, RebuildReceiver, SearchBuildEvent};
pub use text::build_searchable_text;
