//! Detection engines and analyzer adapters.
//!
//! The engines are opaque capabilities (`infer(content) -> rows`); the
//! analyzer adapters normalize raw engine rows into a tag map with one
//! aggregation policy per media kind. The adapters never catch engine
//! failures — decode and engine errors propagate to the pipeline, which
//! routes the record to `error` status.

mod analyzer;
mod engine;
mod http;

pub mod test_helpers;

pub use analyzer::{Analyzer, TagAnalysis};
pub use engine::{Detection, DetectionEngine, FrameDetection, SegmentDetection, VideoInference};
pub use http::ModelServerClient;
