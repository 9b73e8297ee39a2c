//! Load orchestration: progress aggregation, cancellation and the [`Viewer`].

pub mod cancel;
pub mod orchestrator;
pub mod progress;

pub use cancel::CancellationToken;
pub use orchestrator::{PipelineContext, Viewer};
pub use progress::{LoadProgress, LoadStage, NullSink, ProgressSink, ProgressTracker};
