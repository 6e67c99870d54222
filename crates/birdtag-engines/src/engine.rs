//! Detection engine capability interface.
//!
//! Three opaque capabilities behind one trait: image, video and audio
//! inference. The exact model behind each endpoint is out of scope here;
//! the adapter layer only depends on the row shapes below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use birdtag_core::PipelineError;

/// One detected subject in a still image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
}

/// One detected subject in one video frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDetection {
    pub frame_index: u32,
    pub label: String,
    pub confidence: f32,
}

/// Raw video inference output: per-frame detections plus the number of
/// frames the engine actually scanned (informational).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInference {
    pub frames_scanned: u32,
    pub detections: Vec<FrameDetection>,
}

/// One classified segment of an audio clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDetection {
    pub label: String,
    pub confidence: f32,
    pub start_seconds: f32,
    pub end_seconds: f32,
}

/// Opaque species-detection engine.
///
/// Implementations fail with `PipelineError::Decode` when the content
/// cannot be decoded (corrupt file, unsupported codec) and
/// `PipelineError::Engine` when inference itself fails or times out.
#[async_trait]
pub trait DetectionEngine: Send + Sync {
    async fn infer_image(&self, content: &[u8]) -> Result<Vec<Detection>, PipelineError>;

    async fn infer_video(&self, content: &[u8]) -> Result<VideoInference, PipelineError>;

    async fn infer_audio(&self, content: &[u8]) -> Result<Vec<SegmentDetection>, PipelineError>;
}
