//! The asynchronous tagging pipeline.
//!
//! Each stored-object arrival is one independent unit of work:
//! Dispatch → Analyze → Aggregate → Fan-out, strictly in that order
//! within a record and with no shared mutable state across records.
//! Triggers are at-least-once; the aggregation step's overwrite semantics
//! make repeated completion idempotent, while fan-out deliberately has no
//! dedup.

mod dispatcher;
mod pipeline;
mod thumbnail;
mod worker;

pub mod test_helpers;

pub use dispatcher::classify;
pub use pipeline::{ObjectEvent, ProcessOutcome, TaggingPipeline};
pub use thumbnail::{ImageThumbnailer, Thumbnailer};
pub use worker::{PipelineWorker, WorkerConfig};
